use thiserror::Error;

/// Single failure shape for every backend call, whatever went wrong underneath.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Application-level failure inside a response that did arrive.
    #[error("{message}")]
    Business { code: i64, message: String },

    /// No response was received (timeout, refused connection, DNS failure).
    #[error("Network error: {0}")]
    Transport(String),

    /// The call could not be issued at all.
    #[error("Request error: {0}")]
    Request(String),

    /// A success response whose body does not have the expected shape.
    #[error("Invalid response payload: {0}")]
    Payload(String),

    /// The backend answered a connect with `status: "error"`.
    #[error("{0}")]
    ConnectionRejected(String),

    #[error("No data source is connected")]
    NotConnected,
}

impl ApiError {
    pub const UNAUTHORIZED: i64 = 401;

    pub fn business(code: i64, message: impl Into<String>) -> Self {
        ApiError::Business {
            code,
            message: message.into(),
        }
    }

    /// Reserved for session-expiry handling; nothing acts on it yet.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Business { code, .. } if *code == Self::UNAUTHORIZED)
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            ApiError::Business { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
