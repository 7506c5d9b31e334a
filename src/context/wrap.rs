//! Callback context wrapping.
//!
//! # Responsibilities
//! - Capture the current request at the point a callback is registered
//! - Re-establish it whenever the callback (or future) later runs
//! - Provide deferred invocation and task spawning that keep the caller's request
//!
//! # Design Decisions
//! - Capture is eager: wrapping after the originating request has left
//!   scope captures nothing
//! - Arguments and return values pass through unchanged
//! - Futures are bound with a Tokio task-local scope, so the request is
//!   installed for each poll and removed between them

use std::future::Future;

use tokio::task::futures::TaskLocalFuture;
use tokio::task::JoinHandle;

use crate::context::registry;
use crate::request::{Request, WeakRequest};

/// A request captured at a call site, ready to be re-entered later.
///
/// Holds the request weakly: a callback stored on the request itself must
/// not keep it alive. Entering after the request is gone runs with nothing
/// current.
#[derive(Clone, Debug, Default)]
pub struct CapturedContext {
    request: Option<WeakRequest>,
}

impl CapturedContext {
    /// Capture whatever request is current right now.
    pub fn capture() -> Self {
        Self {
            request: registry::current_request().as_ref().map(Request::downgrade),
        }
    }

    /// Capture a specific request.
    pub fn of(request: &Request) -> Self {
        Self {
            request: Some(request.downgrade()),
        }
    }

    /// The captured request, if one was current at capture time and is still alive.
    pub fn request(&self) -> Option<Request> {
        self.request.as_ref().and_then(WeakRequest::upgrade)
    }

    /// Run `f` with the captured request current, restoring the caller's request afterwards.
    pub fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        registry::scope_sync(self.request(), f)
    }

    /// Bind `future` to the captured request for its whole lifetime.
    pub fn scope<F: Future>(&self, future: F) -> TaskLocalFuture<Option<Request>, F> {
        registry::scope(self.request(), future)
    }
}

/// Wrap `f` so it always runs with the request that is current now.
///
/// The returned closure installs the captured request, calls `f`, and
/// restores the invoker's request even if `f` panics.
pub fn wrap_callback<A, R, F>(f: F) -> impl FnOnce(A) -> R + Send + 'static
where
    F: FnOnce(A) -> R + Send + 'static,
    A: 'static,
    R: 'static,
{
    let captured = CapturedContext::capture();
    move |arg| captured.enter(move || f(arg))
}

/// Schedule `f` to run on the runtime after the current call returns.
///
/// # Panics
/// Panics when called outside a Tokio runtime.
pub fn invoke_later<F>(f: F) -> JoinHandle<()>
where
    F: FnOnce() + Send + 'static,
{
    let callback = wrap_callback(move |()| f());
    tokio::spawn(async move {
        tokio::task::yield_now().await;
        callback(());
    })
}

/// Spawn `future` so that every poll observes the request current now.
///
/// # Panics
/// Panics when called outside a Tokio runtime.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(future.in_current_request())
}

/// Attach a request context to any future.
pub trait InRequestContext: Future + Sized {
    /// Bind the future to the request current at this call.
    fn in_current_request(self) -> TaskLocalFuture<Option<Request>, Self> {
        registry::scope(registry::current_request(), self)
    }

    /// Bind the future to `request`.
    fn in_request(self, request: &Request) -> TaskLocalFuture<Option<Request>, Self> {
        registry::scope(Some(request.clone()), self)
    }
}

impl<F: Future> InRequestContext for F {}
