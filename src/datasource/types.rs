//! Data source operation types and error definitions.

use std::fmt;
use std::sync::Arc;

use axum::http::Method;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The two operations a data source supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Get,
    Set,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::Set => "set",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP method used by `set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WriteMethod {
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

impl WriteMethod {
    pub fn as_method(&self) -> Method {
        match self {
            WriteMethod::Post => Method::POST,
            WriteMethod::Put => Method::PUT,
            WriteMethod::Patch => Method::PATCH,
            WriteMethod::Delete => Method::DELETE,
        }
    }
}

impl fmt::Display for WriteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_method().as_str())
    }
}

impl std::str::FromStr for WriteMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "POST" => Ok(WriteMethod::Post),
            "PUT" => Ok(WriteMethod::Put),
            "PATCH" => Ok(WriteMethod::Patch),
            "DELETE" => Ok(WriteMethod::Delete),
            other => Err(format!("unsupported write method '{}'", other)),
        }
    }
}

/// Per-call options for `get` and `set`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationOptions {
    /// Overrides the configured write method for `set`. Ignored by `get`.
    pub write_method: Option<WriteMethod>,
}

impl OperationOptions {
    pub fn with_write_method(write_method: WriteMethod) -> Self {
        Self {
            write_method: Some(write_method),
        }
    }
}

/// Coarse classification of data source failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotWritable,
    TransportError,
    MalformedResponse,
}

/// Errors that can occur during data source operations.
#[derive(Debug, Clone, Error)]
pub enum DataSourceError {
    /// `set` on a data source configured read-only. Raised before any I/O.
    #[error("Cannot execute set on non-writable data source {url}")]
    NotWritable { url: String },

    /// The outbound call failed or returned a non-success status.
    #[error("Transport error for {method} {url}: {message}")]
    Transport {
        method: String,
        url: String,
        status: Option<u16>,
        message: String,
        #[source]
        cause: Option<Arc<reqwest::Error>>,
    },

    /// The response body did not have the shape the pathway requires.
    #[error("Malformed response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },
}

impl DataSourceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DataSourceError::NotWritable { .. } => ErrorKind::NotWritable,
            DataSourceError::Transport { .. } => ErrorKind::TransportError,
            DataSourceError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
        }
    }

    /// Upstream status code, when the failure was a non-success response.
    pub fn status(&self) -> Option<u16> {
        match self {
            DataSourceError::Transport { status, .. } => *status,
            _ => None,
        }
    }

    pub(crate) fn from_reqwest(method: &Method, url: &str, error: reqwest::Error) -> Self {
        DataSourceError::Transport {
            method: method.to_string(),
            url: url.to_string(),
            status: error.status().map(|s| s.as_u16()),
            message: error.to_string(),
            cause: Some(Arc::new(error)),
        }
    }
}

/// Result type for data source operations.
pub type DataSourceResult<T> = Result<T, DataSourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_method_parsing() {
        assert_eq!("put".parse::<WriteMethod>(), Ok(WriteMethod::Put));
        assert_eq!("POST".parse::<WriteMethod>(), Ok(WriteMethod::Post));
        assert!("GET".parse::<WriteMethod>().is_err());
        assert_eq!(WriteMethod::default(), WriteMethod::Post);
        assert_eq!(WriteMethod::Patch.to_string(), "PATCH");
    }

    #[test]
    fn test_error_kinds_and_display() {
        let err = DataSourceError::NotWritable {
            url: "http://localhost:8085/endpoint".into(),
        };
        assert_eq!(err.kind(), ErrorKind::NotWritable);
        assert!(err.to_string().contains("non-writable"));

        let err = DataSourceError::Transport {
            method: "GET".into(),
            url: "http://localhost/x".into(),
            status: Some(503),
            message: "upstream returned 503".into(),
            cause: None,
        };
        assert_eq!(err.kind(), ErrorKind::TransportError);
        assert_eq!(err.status(), Some(503));
        assert!(std::error::Error::source(&err).is_none());
    }
}
