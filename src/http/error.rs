//! Error taxonomy for authenticated calls.

use reqwest::StatusCode;
use serde_json::Value;

use super::envelope::Envelope;

/// Failure below the business envelope: the call never produced a usable body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The server answered with a non-2xx status.
    #[error("HTTP {status} error")]
    Status { status: u16, body: String },
    #[error("Request timed out")]
    Timeout,
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
    #[error("Request failed: {0}")]
    Request(String),
}

impl TransportError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TransportError::Status { status, .. } => StatusCode::from_u16(*status).ok(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TransportError::Timeout
        } else if error.is_connect() {
            TransportError::Connect(error.to_string())
        } else if let Some(status) = error.status() {
            TransportError::Status {
                status: status.as_u16(),
                body: String::new(),
            }
        } else {
            TransportError::Request(error.to_string())
        }
    }
}

/// What a caller of [`AuthClient`](super::AuthClient) can observe.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport failure, or a request that could not be built; never triggers a refresh.
    #[error("Network error: {0}")]
    Network(#[from] TransportError),

    /// The call went through but the backend rejected the operation.
    #[error("Business error {code}: {message}")]
    Business {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    /// The credential expired and could not be renewed; the session is gone.
    #[error("Session expired, please log in again")]
    SessionExpired,

    /// The body was not a business envelope, or its payload did not match the expected type.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn business(envelope: Envelope<Value>) -> Self {
        ApiError::Business {
            code: envelope.code,
            message: envelope.message,
            data: envelope.data,
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
    }

    /// Business code carried by the error, if it came from an envelope.
    pub fn code(&self) -> Option<i64> {
        match self {
            ApiError::Business { code, .. } => Some(*code),
            _ => None,
        }
    }
}
