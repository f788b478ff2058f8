use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::{
    ApiRequest, HttpTransport, LogNotifier, Notifier, RawResponse, RequestOptions, Transport,
    TransportFailure,
};
use crate::utils::{normalize_prefix, ApiError, ApiResult, ClientConfig};

const GENERIC_FAILURE: &str = "Request failed";
const NETWORK_FAILURE: &str = "Network error or timeout, please retry later";
const PAYLOAD_FAILURE: &str = "Unexpected response from server";
const OCTET_STREAM: &str = "application/octet-stream";

/// A successful, classified response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Binary(Vec<u8>),
}

struct Failure {
    error: ApiError,
    notice: String,
}

/// Classifies a raw response. Binary bodies win over every other check.
fn classify(raw: RawResponse) -> Result<Payload, Failure> {
    let is_octet_stream = raw
        .content_type
        .as_deref()
        .map(|ct| ct.to_ascii_lowercase().contains(OCTET_STREAM))
        .unwrap_or(false);

    let text = match String::from_utf8(raw.body) {
        Ok(text) if !is_octet_stream => text,
        Ok(text) => return Ok(Payload::Binary(text.into_bytes())),
        Err(e) => return Ok(Payload::Binary(e.into_bytes())),
    };

    let value = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };

    if !(200..300).contains(&raw.status) {
        let detail = value
            .get("detail")
            .or_else(|| value.get("message"))
            .map(|d| match d {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
        let (message, notice) = match detail {
            Some(detail) => (detail.clone(), format!("{}: {}", GENERIC_FAILURE, detail)),
            None => {
                let notice = format!("{} [{}]", GENERIC_FAILURE, raw.status);
                (notice.clone(), notice)
            }
        };
        return Err(Failure {
            error: ApiError::business(i64::from(raw.status), message),
            notice,
        });
    }

    // A zero code is treated like an absent one.
    if let Some(code) = value.get("code").and_then(Value::as_i64) {
        if code != 0 && code != 200 {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or(GENERIC_FAILURE)
                .to_string();
            return Err(Failure {
                error: ApiError::business(code, message.clone()),
                notice: message,
            });
        }
    }

    Ok(Payload::Json(value))
}

/// Normalizing client: one attempt per call, one notification per failure.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn Notifier>,
    prefix: String,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, notifier: Arc<dyn Notifier>, prefix: &str) -> Self {
        Self {
            transport,
            notifier,
            prefix: normalize_prefix(prefix),
        }
    }

    /// reqwest transport and log notifications, configured from `config`.
    pub fn from_config(config: &ClientConfig) -> ApiResult<Self> {
        let transport = HttpTransport::new(config).map_err(|e| match e {
            TransportFailure::Request(msg) | TransportFailure::NoResponse(msg) => ApiError::Request(msg),
        })?;
        Ok(Self::new(Arc::new(transport), Arc::new(LogNotifier), &config.api_prefix))
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn fail(&self, error: ApiError, notice: &str) -> ApiError {
        self.notifier.notify_error(notice);
        error
    }

    /// Sends `request` (path relative to the version prefix) and classifies the outcome.
    pub async fn execute(&self, mut request: ApiRequest) -> ApiResult<Payload> {
        request.path = format!("{}{}", self.prefix, request.path);

        let raw = match self.transport.send(&request).await {
            Ok(raw) => raw,
            Err(TransportFailure::NoResponse(msg)) => {
                error!("{} {} got no response: {}", request.method, request.path, msg);
                return Err(self.fail(ApiError::Transport(msg), NETWORK_FAILURE));
            }
            Err(TransportFailure::Request(msg)) => {
                error!("{} {} could not be issued: {}", request.method, request.path, msg);
                let notice = format!("Request error: {}", msg);
                return Err(self.fail(ApiError::Request(msg), &notice));
            }
        };

        let status = raw.status;
        match classify(raw) {
            Ok(payload) => {
                debug!("{} {} -> {}", request.method, request.path, status);
                Ok(payload)
            }
            Err(Failure { error, notice }) => {
                if error.is_unauthorized() {
                    warn!("{} {} rejected as unauthorized", request.method, request.path);
                } else {
                    warn!("{} {} failed: {}", request.method, request.path, error);
                }
                Err(self.fail(error, &notice))
            }
        }
    }

    fn decode<T: DeserializeOwned>(&self, path: &str, payload: Payload) -> ApiResult<T> {
        let value = match payload {
            Payload::Json(value) => value,
            Payload::Binary(bytes) => {
                let msg = format!("{} returned {} bytes of binary data", path, bytes.len());
                return Err(self.fail(ApiError::Payload(msg), PAYLOAD_FAILURE));
            }
        };
        serde_json::from_value(value).map_err(|e| {
            warn!("Failed to decode response from {}: {}", path, e);
            self.fail(ApiError::Payload(format!("{}: {}", path, e)), PAYLOAD_FAILURE)
        })
    }

    fn encode<B: Serialize>(&self, body: &B) -> ApiResult<Value> {
        serde_json::to_value(body).map_err(|e| {
            let notice = format!("Request error: {}", e);
            self.fail(ApiError::Request(e.to_string()), &notice)
        })
    }

    async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        let path = request.path.clone();
        let payload = self.execute(request).await?;
        self.decode(&path, payload)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.call(ApiRequest::new(Method::GET, path)).await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> ApiResult<T> {
        self.call(ApiRequest::new(Method::GET, path).with_query(query)).await
    }

    pub async fn get_binary(&self, path: &str, options: RequestOptions) -> ApiResult<Vec<u8>> {
        match self.execute(ApiRequest::new(Method::GET, path).with_options(options)).await? {
            Payload::Binary(bytes) => Ok(bytes),
            Payload::Json(value) => Ok(value.to_string().into_bytes()),
        }
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> ApiResult<T> {
        let body = self.encode(body)?;
        self.call(ApiRequest::new(Method::POST, path).with_body(body)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> ApiResult<T> {
        let body = self.encode(body)?;
        self.call(ApiRequest::new(Method::PUT, path).with_body(body)).await
    }

    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        self.execute(ApiRequest::new(Method::DELETE, path)).await?;
        Ok(())
    }
}
