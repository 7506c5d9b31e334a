//! Relay subsystem: inbound request → data source → request promise.
//!
//! # Data Flow
//! ```text
//! RequestHandler::handle_request (request current)
//!     → handler.rs picks get or set and calls the data source
//!     → data source promise settles (request restored by the wrapped callback)
//!     → request promise resolved or rejected with the outcome
//! ```

pub mod handler;

pub use handler::RelayHandler;
