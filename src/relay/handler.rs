//! Relay request handler.
//!
//! # Responsibilities
//! - Perform `get` for read routes and `set` for write routes
//! - Forward the inbound JSON body as the write model
//! - Settle the inbound request's promise with the data source outcome
//!
//! # Design Decisions
//! - Settlement targets the request that dispatched the call, captured
//!   when the handler ran
//! - A callback observing a different current request is logged loudly;
//!   it means a suspension point escaped the context wrapper

use std::sync::Arc;

use crate::context;
use crate::datasource::{DataSource, Operation, OperationOptions, WriteMethod};
use crate::request::{Request, RequestHandler};

/// Relays inbound requests through a data source.
#[derive(Debug, Clone)]
pub struct RelayHandler {
    data_source: Arc<dyn DataSource>,
    operation: Operation,
    write_method: Option<WriteMethod>,
}

impl RelayHandler {
    /// A read route: `get` on every request.
    pub fn read(data_source: Arc<dyn DataSource>) -> Self {
        Self {
            data_source,
            operation: Operation::Get,
            write_method: None,
        }
    }

    /// A write route: `set`, optionally forcing the write method.
    pub fn write(data_source: Arc<dyn DataSource>, write_method: Option<WriteMethod>) -> Self {
        Self {
            data_source,
            operation: Operation::Set,
            write_method,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Start the data source operation for `request` and wire its settlement.
    pub fn relay(&self, request: &Request) {
        let options = OperationOptions {
            write_method: self.write_method,
        };
        let response = self
            .data_source
            .perform(self.operation, None, request.body(), &options);

        tracing::debug!(
            request_id = %request.id(),
            operation = %self.operation,
            write_method = ?self.write_method,
            "Relaying request through data source"
        );

        let dispatched = request.clone();
        let failed = request.clone();
        response.then(
            move |value| {
                check_context(&dispatched);
                dispatched.promise().resolve(value);
            },
            move |error| {
                check_context(&failed);
                tracing::warn!(request_id = %failed.id(), error = %error, "Data source operation failed");
                failed.promise().reject(error.into());
            },
        );
    }
}

impl RequestHandler for RelayHandler {
    fn handle_request(&self, request: &Request) {
        self.relay(request)
    }
}

fn check_context(expected: &Request) {
    match context::current_request() {
        Some(current) if current == *expected => {}
        Some(current) => tracing::error!(
            request_id = %expected.id(),
            current_request_id = %current.id(),
            "Data source callback resumed under a different request"
        ),
        None => tracing::error!(
            request_id = %expected.id(),
            "Data source callback resumed without a request context"
        ),
    }
}
