//! Request-level error type
//!
//! Every failure aborts the current request and is reported with its raw
//! text as the response body.

use hyper::{Method, StatusCode};

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed path segment, body or multipart payload (400)
    #[error("{0}")]
    BadRequest(String),

    /// No route, or the addressed rows do not exist (404)
    #[error("{0}")]
    NotFound(String),

    /// Route exists but not for this method (405)
    #[error("Method not allowed")]
    MethodNotAllowed { allowed: Method },

    /// Body exceeds the configured limit (413)
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Storage, encoding or filesystem failure (500)
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NoRows(message) => Self::NotFound(message),
            other => Self::Internal(other.to_string()),
        }
    }
}
