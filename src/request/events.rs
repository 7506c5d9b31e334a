//! Request lifecycle events.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use crate::context::CapturedContext;
use crate::request::types::RequestError;

type EventListener<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// A multicast event. Listeners fire in registration order and run with the
/// request that was current when they were added.
pub struct Event<A> {
    name: &'static str,
    listeners: Mutex<Vec<EventListener<A>>>,
}

impl<A: 'static> Event<A> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn add_listener<F>(&self, listener: F)
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        let captured = CapturedContext::capture();
        let wrapped: EventListener<A> = Arc::new(move |arg: &A| captured.enter(|| listener(arg)));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(wrapped);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn fire(&self, arg: &A) {
        // Snapshot so listeners may register further listeners.
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        tracing::trace!(event = self.name, listeners = listeners.len(), "Firing event");
        for listener in listeners {
            listener(arg);
        }
    }

    /// Drop every listener.
    pub fn clear(&self) {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl<A> std::fmt::Debug for Event<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event").field("name", &self.name).finish_non_exhaustive()
    }
}

/// The events every inbound request exposes.
#[derive(Debug)]
pub struct RequestEvents {
    /// Fired with the resolved value.
    pub on_success: Event<Value>,
    /// Fired with the resolved value, after `on_success`.
    pub on_complete: Event<Value>,
    /// Fired with the rejection error.
    pub on_error: Event<RequestError>,
}

impl RequestEvents {
    pub fn new() -> Self {
        Self {
            on_success: Event::new("onSuccess"),
            on_complete: Event::new("onComplete"),
            on_error: Event::new("onError"),
        }
    }
}

impl RequestEvents {
    /// Release listeners once the request has settled; they can never fire again.
    pub(crate) fn clear(&self) {
        self.on_success.clear();
        self.on_complete.clear();
        self.on_error.clear();
    }
}

impl Default for RequestEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fire_in_order() {
        let event: Event<u32> = Event::new("test");
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second"] {
            let seen = seen.clone();
            event.add_listener(move |v: &u32| seen.lock().unwrap().push((tag, *v)));
        }

        event.fire(&3);
        assert_eq!(*seen.lock().unwrap(), vec![("first", 3), ("second", 3)]);
        assert_eq!(event.listener_count(), 2);
    }
}
