//! Single-settlement promises.
//!
//! # Responsibilities
//! - Hold the outcome of one asynchronous operation
//! - Fire listeners exactly once, in registration order
//! - Expose settlement to async code through `wait`
//!
//! # Design Decisions
//! - Settlement after the first is a silent no-op (reported by the `bool`
//!   returned from `resolve`/`reject`)
//! - Listeners run synchronously on the settling thread, outside the lock
//! - `then` callbacks are context-wrapped at registration time

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;

use crate::context::CapturedContext;

type Listener<T, E> = Box<dyn FnOnce(Result<T, E>) + Send>;

enum State<T, E> {
    Pending(Vec<Listener<T, E>>),
    Settled(Result<T, E>),
}

/// A handle to a single-settlement outcome. Clones share the same state.
pub struct Promise<T, E> {
    state: Arc<Mutex<State<T, E>>>,
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Create a pending promise.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::Pending(Vec::new()))),
        }
    }

    /// Create a promise already resolved with `value`.
    pub fn resolved(value: T) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::Settled(Ok(value)))),
        }
    }

    /// Create a promise already rejected with `error`.
    pub fn rejected(error: E) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::Settled(Err(error)))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T, E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve with `value`. Returns `false` if the promise was already settled.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Reject with `error`. Returns `false` if the promise was already settled.
    pub fn reject(&self, error: E) -> bool {
        self.settle(Err(error))
    }

    /// Settle with `outcome`. Returns `false` if the promise was already settled.
    pub fn settle(&self, outcome: Result<T, E>) -> bool {
        let listeners = {
            let mut state = self.lock();
            match &mut *state {
                State::Settled(_) => {
                    tracing::debug!(
                        rejected = outcome.is_err(),
                        "Ignoring settlement of an already settled promise"
                    );
                    return false;
                }
                State::Pending(listeners) => {
                    let listeners = std::mem::take(listeners);
                    *state = State::Settled(outcome.clone());
                    listeners
                }
            }
        };

        for listener in listeners {
            listener(outcome.clone());
        }
        true
    }

    /// Whether `resolve` or `reject` has taken effect.
    pub fn is_settled(&self) -> bool {
        matches!(*self.lock(), State::Settled(_))
    }

    /// The settled outcome, if any.
    pub fn peek(&self) -> Option<Result<T, E>> {
        match &*self.lock() {
            State::Settled(outcome) => Some(outcome.clone()),
            State::Pending(_) => None,
        }
    }

    /// Register a raw listener for the outcome. Runs immediately if already settled.
    ///
    /// The listener is not context-wrapped; use [`Promise::then`] for handler code.
    pub fn subscribe(&self, listener: impl FnOnce(Result<T, E>) + Send + 'static) {
        let settled = {
            let mut state = self.lock();
            match &mut *state {
                State::Pending(listeners) => {
                    listeners.push(Box::new(listener));
                    return;
                }
                State::Settled(outcome) => outcome.clone(),
            }
        };
        listener(settled);
    }

    /// Register resolution and rejection callbacks.
    ///
    /// Exactly one of them runs, with the request that is current now
    /// re-established as current.
    pub fn then<R, J>(&self, on_resolved: R, on_rejected: J)
    where
        R: FnOnce(T) + Send + 'static,
        J: FnOnce(E) + Send + 'static,
    {
        let captured = CapturedContext::capture();
        self.subscribe(move |outcome| {
            captured.enter(move || match outcome {
                Ok(value) => on_resolved(value),
                Err(error) => on_rejected(error),
            })
        });
    }

    /// Wait for settlement.
    pub fn wait(&self) -> impl std::future::Future<Output = Result<T, WaitError<E>>> + Send + 'static {
        let (tx, rx) = oneshot::channel();
        self.subscribe(move |outcome| {
            let _ = tx.send(outcome);
        });
        async move {
            match rx.await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(error)) => Err(WaitError::Rejected(error)),
                Err(_) => Err(WaitError::Abandoned),
            }
        }
    }

    /// Wait for settlement, giving up after `limit`.
    ///
    /// A settlement arriving after the deadline is ignored by the caller but
    /// still settles the promise for any other listener.
    pub async fn wait_timeout(&self, limit: Duration) -> Result<T, WaitError<E>> {
        match tokio::time::timeout(limit, self.wait()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(WaitError::TimedOut(limit)),
        }
    }
}

impl<T, E> Default for Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> std::fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match &*self.state.lock().unwrap_or_else(PoisonError::into_inner) {
            State::Pending(listeners) => format!("pending ({} listeners)", listeners.len()),
            State::Settled(Ok(_)) => "resolved".to_string(),
            State::Settled(Err(_)) => "rejected".to_string(),
        };
        f.debug_struct("Promise").field("status", &status).finish()
    }
}

/// Why waiting on a promise produced no value.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitError<E> {
    /// The promise was rejected.
    Rejected(E),
    /// Every handle was dropped before settlement.
    Abandoned,
    /// No settlement arrived within the deadline.
    TimedOut(Duration),
}

impl<E: std::fmt::Display> std::fmt::Display for WaitError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitError::Rejected(e) => write!(f, "{}", e),
            WaitError::Abandoned => write!(f, "Promise dropped before settlement"),
            WaitError::TimedOut(limit) => write!(f, "Promise not settled within {:?}", limit),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for WaitError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WaitError::Rejected(e) => Some(e),
            _ => None,
        }
    }
}
