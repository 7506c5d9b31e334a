//! Inbound body decoding.
//!
//! # Responsibilities
//! - Turn the raw inbound body into the request's JSON model
//! - Reject malformed JSON declared as JSON with 400
//!
//! # Design Decisions
//! - An empty body means "no model", not `null`
//! - Bodies without a JSON content type are relayed as JSON strings

use axum::http::{header, HeaderMap};
use serde_json::Value;

use crate::datasource::payload::is_json_content_type;
use crate::request::RequestError;

/// Decode an inbound body into the request model.
pub fn decode_body(headers: &HeaderMap, bytes: &[u8]) -> Result<Option<Value>, RequestError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let content_type = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok());
    match content_type {
        Some(ct) if is_json_content_type(ct) => serde_json::from_slice(bytes)
            .map(Some)
            .map_err(|e| RequestError::InvalidBody(e.to_string())),
        Some(_) => Ok(Some(Value::String(String::from_utf8_lossy(bytes).into_owned()))),
        // Undeclared: JSON if it parses.
        None => Ok(Some(
            serde_json::from_slice(bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned())),
        )),
    }
}
