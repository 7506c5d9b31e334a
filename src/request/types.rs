//! Request identifiers and request-level errors.

use std::fmt;
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use thiserror::Error;

use crate::datasource::{DataSourceError, ErrorKind};

/// Header carrying the request identifier.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Unique identifier of an inbound request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a fresh UUID v4 identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Reuse the `x-request-id` header when present and valid, otherwise generate one.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(Self::from)
            .unwrap_or_else(Self::generate)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why an inbound request's promise was rejected.
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    /// A data source operation failed.
    #[error(transparent)]
    DataSource(#[from] DataSourceError),

    /// A handler rejected the request directly.
    #[error("{message}")]
    Handler { status: u16, message: String },

    /// The inbound body could not be decoded.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Nothing settled the request before the transport deadline.
    #[error("Request not settled within {0:?}")]
    Timeout(Duration),
}

impl RequestError {
    /// Reject with an explicit status and message.
    pub fn handler(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Handler {
            status: status.as_u16(),
            message: message.into(),
        }
    }

    /// HTTP status the transport edge answers with.
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::DataSource(e) => match e.kind() {
                ErrorKind::NotWritable => StatusCode::METHOD_NOT_ALLOWED,
                ErrorKind::TransportError | ErrorKind::MalformedResponse => StatusCode::BAD_GATEWAY,
            },
            RequestError::Handler { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            RequestError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            RequestError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}
