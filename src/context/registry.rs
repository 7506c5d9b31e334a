//! Current-request registry.
//!
//! # Responsibilities
//! - Record which inbound request is current on the executing path
//! - Scope that request around a synchronous call or an entire future
//!
//! # Design Decisions
//! - Backed by a Tokio task-local, so the slot is never shared between
//!   concurrently running tasks or threads
//! - Setting and clearing are scoped; the caller's request is restored when
//!   the scope ends, including on unwind

use std::future::Future;

use tokio::task::futures::TaskLocalFuture;

use crate::request::Request;

tokio::task_local! {
    static CURRENT: Option<Request>;
}

/// Run `f` with `request` (or nothing) current.
pub(crate) fn scope_sync<R>(request: Option<Request>, f: impl FnOnce() -> R) -> R {
    CURRENT.sync_scope(request, f)
}

/// Bind `future` so every poll observes `request` (or nothing) as current.
pub(crate) fn scope<F: Future>(request: Option<Request>, future: F) -> TaskLocalFuture<Option<Request>, F> {
    CURRENT.scope(request, future)
}

/// Run `f` with `request` current.
pub fn set_current<R>(request: Request, f: impl FnOnce() -> R) -> R {
    scope_sync(Some(request), f)
}

/// Run `f` with no request current.
pub fn clear_current<R>(f: impl FnOnce() -> R) -> R {
    scope_sync(None, f)
}

/// The request owning the executing call path, if any.
pub fn current_request() -> Option<Request> {
    CURRENT.try_with(|current| current.clone()).ok().flatten()
}
