//! Response body decoding.
//!
//! # Responsibilities
//! - Decode `get` bodies according to their declared content type
//! - Apply the narrow set-response pathway to `set` bodies
//! - Turn non-success statuses into transport errors
//!
//! # Design Decisions
//! - The set-response pathway is JSON only; anything that is not a JSON
//!   object or array fails rather than passing through
//! - Blank bodies are `null` on both paths

use axum::http::{Method, StatusCode};
use serde_json::Value;

use crate::datasource::types::{DataSourceError, DataSourceResult};

/// Longest slice of an upstream error body carried into the error message.
const MAX_ERROR_BODY: usize = 256;

/// A fully buffered outbound response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: String,
}

/// Whether a content type declares a JSON payload.
pub fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

/// Reject non-success statuses, keeping a bounded excerpt of the body.
pub fn check_status(method: &Method, url: &str, response: &RawResponse) -> DataSourceResult<()> {
    if response.status.is_success() {
        return Ok(());
    }
    let excerpt: String = response.body.trim().chars().take(MAX_ERROR_BODY).collect();
    Err(DataSourceError::Transport {
        method: method.to_string(),
        url: url.to_string(),
        status: Some(response.status.as_u16()),
        message: format!("upstream returned {}: {}", response.status, excerpt),
        cause: None,
    })
}

/// Decode a `get` response body.
pub fn decode_read(url: &str, response: &RawResponse) -> DataSourceResult<Value> {
    let body = response.body.trim();
    if body.is_empty() {
        return Ok(Value::Null);
    }

    match response.content_type.as_deref() {
        Some(ct) if is_json_content_type(ct) => {
            serde_json::from_str(body).map_err(|e| DataSourceError::MalformedResponse {
                url: url.to_string(),
                reason: format!("declared JSON but failed to parse: {}", e),
            })
        }
        Some(_) => Ok(Value::String(response.body.clone())),
        None => Ok(serde_json::from_str(body).unwrap_or_else(|_| Value::String(response.body.clone()))),
    }
}

/// Decode a `set` response body through the set-response pathway.
pub fn decode_write(url: &str, response: &RawResponse) -> DataSourceResult<Value> {
    let body = response.body.trim();
    if body.is_empty() {
        return Ok(Value::Null);
    }

    let parsed: Value = serde_json::from_str(body).map_err(|e| DataSourceError::MalformedResponse {
        url: url.to_string(),
        reason: format!("set response is not JSON: {}", e),
    })?;

    match parsed {
        Value::Object(_) | Value::Array(_) => Ok(parsed),
        other => Err(DataSourceError::MalformedResponse {
            url: url.to_string(),
            reason: format!("set response must be a JSON object or array, got {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::ErrorKind;
    use serde_json::json;

    const URL: &str = "http://localhost:8085/endpoint";

    fn response(status: u16, content_type: Option<&str>, body: &str) -> RawResponse {
        RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            content_type: content_type.map(str::to_string),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_json_content_types() {
        assert!(is_json_content_type("application/json"));
        assert!(is_json_content_type("application/json; charset=utf-8"));
        assert!(is_json_content_type("application/problem+json"));
        assert!(!is_json_content_type("text/plain"));
    }

    #[test]
    fn test_read_decodes_json_scalar() {
        let value = decode_read(URL, &response(200, Some("application/json"), "42\n")).unwrap();
        assert_eq!(value, json!(42));
    }

    #[test]
    fn test_read_keeps_text_verbatim() {
        let value = decode_read(URL, &response(200, Some("text/plain"), "42")).unwrap();
        assert_eq!(value, json!("42"));

        let untyped = decode_read(URL, &response(200, None, "{\"a\":1}")).unwrap();
        assert_eq!(untyped, json!({"a": 1}));

        let untyped_text = decode_read(URL, &response(200, None, "hello")).unwrap();
        assert_eq!(untyped_text, json!("hello"));
    }

    #[test]
    fn test_read_rejects_bad_declared_json() {
        let err = decode_read(URL, &response(200, Some("application/json"), "{oops")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn test_write_parses_object() {
        let body = "{\"payload\":\"post return value\"}\n";
        let value = decode_write(URL, &response(200, Some("text/plain"), body)).unwrap();
        assert!(value.is_object());
        assert_eq!(value, json!({"payload": "post return value"}));
    }

    #[test]
    fn test_write_rejects_primitives_and_garbage() {
        let scalar = decode_write(URL, &response(200, Some("application/json"), "42")).unwrap_err();
        assert_eq!(scalar.kind(), ErrorKind::MalformedResponse);

        let string = decode_write(URL, &response(200, None, "\"text\"")).unwrap_err();
        assert_eq!(string.kind(), ErrorKind::MalformedResponse);

        let garbage = decode_write(URL, &response(200, None, "<html>")).unwrap_err();
        assert_eq!(garbage.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn test_blank_bodies_are_null() {
        assert_eq!(decode_write(URL, &response(204, None, "")).unwrap(), Value::Null);
        assert_eq!(decode_read(URL, &response(200, None, "  \n")).unwrap(), Value::Null);
    }

    #[test]
    fn test_non_success_status_is_transport_error() {
        let err = check_status(&Method::PUT, URL, &response(503, None, "down")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransportError);
        assert_eq!(err.status(), Some(503));
        assert!(err.to_string().contains("down"));

        assert!(check_status(&Method::GET, URL, &response(201, None, "")).is_ok());
    }
}
