//! Inbound request model.
//!
//! # Data Flow
//! ```text
//! transport edge decodes an HTTP exchange
//!     → Request::new (id, method, path, body, fresh RequestPromise)
//!     → RequestHandler::handle_request runs with the request current
//!     → handler (or a later callback) settles the RequestPromise
//!     → events fire (onSuccess + onComplete, or onError)
//!     → transport edge writes the response
//! ```
//!
//! # Design Decisions
//! - A request owns exactly one promise, created with it
//! - `Request` is a cheap handle; equality is identity, not id comparison

pub mod events;
pub mod promise;
pub mod types;

use std::sync::{Arc, Weak};

use axum::http::Method;
use serde_json::Value;

use crate::context;

pub use events::{Event, RequestEvents};
pub use promise::{Promise, WaitError};
pub use types::{RequestError, RequestId, X_REQUEST_ID};

/// The promise driving an inbound request's response.
pub type RequestPromise = Promise<Value, RequestError>;

struct Inner {
    id: RequestId,
    method: Method,
    path: String,
    body: Option<Value>,
    promise: RequestPromise,
    events: Arc<RequestEvents>,
}

/// One inbound HTTP transaction.
#[derive(Clone)]
pub struct Request {
    inner: Arc<Inner>,
}

impl Request {
    /// Create a request with a fresh pending promise wired to its events.
    pub fn new(id: RequestId, method: Method, path: impl Into<String>, body: Option<Value>) -> Self {
        let promise = RequestPromise::new();
        let events = Arc::new(RequestEvents::new());

        let wired = events.clone();
        promise.subscribe(move |outcome| match outcome {
            Ok(value) => {
                wired.on_success.fire(&value);
                wired.on_complete.fire(&value);
                wired.clear();
            }
            Err(error) => {
                wired.on_error.fire(&error);
                wired.clear();
            }
        });

        Self {
            inner: Arc::new(Inner {
                id,
                method,
                path: path.into(),
                body,
                promise,
                events,
            }),
        }
    }

    pub fn id(&self) -> &RequestId {
        &self.inner.id
    }

    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Decoded inbound body, if one was sent.
    pub fn body(&self) -> Option<&Value> {
        self.inner.body.as_ref()
    }

    pub fn promise(&self) -> &RequestPromise {
        &self.inner.promise
    }

    pub fn events(&self) -> &RequestEvents {
        &self.inner.events
    }

    /// Run `f` with this request current.
    pub fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        context::set_current(self.clone(), f)
    }

    /// A handle that does not keep the request alive.
    pub fn downgrade(&self) -> WeakRequest {
        WeakRequest {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

/// Non-owning reference to a [`Request`].
///
/// Captured contexts hold one of these so listeners stored on a request
/// never keep that request alive.
#[derive(Clone)]
pub struct WeakRequest {
    inner: Weak<Inner>,
}

impl WeakRequest {
    /// The request, if any strong handle remains.
    pub fn upgrade(&self) -> Option<Request> {
        self.inner.upgrade().map(|inner| Request { inner })
    }
}

impl std::fmt::Debug for WeakRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.upgrade() {
            Some(request) => f.debug_tuple("WeakRequest").field(request.id()).finish(),
            None => f.write_str("WeakRequest(dropped)"),
        }
    }
}

impl PartialEq for Request {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Request {}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.inner.id)
            .field("method", &self.inner.method)
            .field("path", &self.inner.path)
            .finish_non_exhaustive()
    }
}

/// Application logic bound to a route.
///
/// Handlers run with the request current and must eventually settle
/// `request.promise()`, directly or from a callback.
pub trait RequestHandler: Send + Sync {
    fn handle_request(&self, request: &Request);
}

impl<F> RequestHandler for F
where
    F: Fn(&Request) + Send + Sync,
{
    fn handle_request(&self, request: &Request) {
        self(request)
    }
}
