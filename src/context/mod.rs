//! Request context propagation subsystem.
//!
//! # Data Flow
//! ```text
//! Handler runs with request R current
//!     → wrap.rs captures R at the call site (closure or future)
//!     → callback handed to a scheduler (spawned task, timer, promise listener)
//!     → callback later invoked on any worker thread
//!     → registry.rs scopes R around the call (task-local)
//!     → caller's request restored on return or unwind
//! ```
//!
//! # Design Decisions
//! - The current request is a Tokio task-local, scoped around a synchronous
//!   call or a whole future; outside a scope it is empty
//! - Capture happens in the closure, so two in-flight requests never share state
//! - Captured requests are held weakly, so listeners stored on a request
//!   never keep it alive
//! - One decorator is used at every asynchronous boundary

pub mod registry;
pub mod wrap;

pub use registry::{clear_current, current_request, set_current};
pub use wrap::{invoke_later, spawn, wrap_callback, CapturedContext, InRequestContext};
