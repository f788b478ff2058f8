use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use std::time::Duration;
use url::Url;

use super::{ApiRequest, RawResponse, Transport, TransportFailure};
use crate::utils::ClientConfig;

/// reqwest-backed transport with a fixed per-call deadline.
pub struct HttpTransport {
    base_url: Url,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportFailure> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("touchlink-datasource/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportFailure::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_client(config, client))
    }

    /// Uses a caller-built client (custom proxies, TLS roots).
    pub fn with_client(config: &ClientConfig, client: reqwest::Client) -> Self {
        Self {
            base_url: config.api_url.clone(),
            client,
            timeout: config.timeout,
        }
    }

    fn url_for(&self, path: &str) -> Result<Url, TransportFailure> {
        let joined = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path);
        Url::parse(&joined)
            .map_err(|e| TransportFailure::Request(format!("Invalid request URL {}: {}", joined, e)))
    }

    fn headers_for(request: &ApiRequest) -> Result<HeaderMap, TransportFailure> {
        let mut headers = HeaderMap::new();
        for (name, value) in &request.options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportFailure::Request(format!("Invalid header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportFailure::Request(format!("Invalid header value for {}: {}", name, e)))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

fn classify_send_error(error: reqwest::Error) -> TransportFailure {
    if error.is_builder() {
        TransportFailure::Request(error.to_string())
    } else if error.is_timeout() {
        TransportFailure::NoResponse(format!("Request timed out: {}", error))
    } else {
        TransportFailure::NoResponse(error.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportFailure> {
        let url = self.url_for(&request.path)?;
        let headers = Self::headers_for(request)?;

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .headers(headers)
            .timeout(request.options.timeout.unwrap_or(self.timeout));

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!("{} {}", request.method, request.path);

        let response = builder.send().await.map_err(classify_send_error)?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportFailure::NoResponse(format!("Failed to read response body: {}", e)))?;

        Ok(RawResponse {
            status,
            content_type,
            body: body.to_vec(),
        })
    }
}
