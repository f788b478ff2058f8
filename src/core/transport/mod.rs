//! Transport normalizer.
//!
//! Every backend call goes through [`ApiClient`], which turns whatever the
//! [`Transport`] produced into exactly one of: a binary payload, a JSON
//! payload, or an [`ApiError`](crate::utils::ApiError). Failures also raise a
//! single user-facing notification through the [`Notifier`].

pub mod client;
pub mod http;
pub mod notify;

pub use client::*;
pub use http::*;
pub use notify::*;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

/// Per-call overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub headers: Vec<(String, String)>,
    /// Replaces the configured deadline for this call only.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Full path including the version prefix.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub options: RequestOptions,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            options: RequestOptions::default(),
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

/// What came back over the wire, before any classification.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            content_type: Some("application/json".to_string()),
            body: body.to_string().into_bytes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    /// Sent (or attempted) but nothing came back.
    NoResponse(String),
    /// Could not be built or issued.
    Request(String),
}

/// Raw HTTP seam. Implementations attempt the call exactly once.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportFailure>;
}
