//! HTTP transport edge.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum router, request ID, tracing)
//!     → request.rs (decode the inbound body)
//!     → RequestHandler runs with the new Request current
//!     → request promise settles
//!     → response.rs (status and JSON body)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::decode_body;
pub use response::settlement_response;
pub use server::{HttpServer, ServerError};
