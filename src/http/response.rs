//! Response mapping.
//!
//! # Responsibilities
//! - Write a resolved request value as a 200 JSON body
//! - Map rejections to a status and `{"isError": true, "message": ...}`
//!
//! # Design Decisions
//! - Unsettled requests answer 504 Gateway Timeout
//! - Abandoned promises answer 500; they indicate a handler bug

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::request::{RequestError, RequestId, WaitError};

/// Build the HTTP response for a request's settlement.
pub fn settlement_response(request_id: &RequestId, outcome: Result<Value, WaitError<RequestError>>) -> Response {
    match outcome {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(error) => {
            let status = match &error {
                WaitError::Rejected(e) => e.status(),
                WaitError::Abandoned => StatusCode::INTERNAL_SERVER_ERROR,
                WaitError::TimedOut(_) => StatusCode::GATEWAY_TIMEOUT,
            };
            tracing::warn!(
                request_id = %request_id,
                status = status.as_u16(),
                error = %error,
                "Request failed"
            );
            error_response(status, &error.to_string())
        }
    }
}

/// JSON error body with the given status.
pub fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"isError": true, "message": message}))).into_response()
}
