//! Data source subsystem.
//!
//! # Data Flow
//! ```text
//! handler calls get/set (inbound request current)
//!     → url.rs resolves the URL template, serializes the payload
//!     → completion callback wrapped with the current request
//!     → outbound HTTP exchange on a detached task (retries for reads)
//!     → payload.rs decodes (read) or runs the set-response pathway (write)
//!     → wrapped callback settles the returned promise with the request restored
//! ```
//!
//! # Design Decisions
//! - Operations return a promise immediately; nothing blocks on I/O
//! - Write checks happen before any I/O is scheduled
//! - No cancellation: callers race the promise against a timer if needed

pub mod payload;
pub mod template;
pub mod types;
pub mod url;

use serde_json::Value;

use crate::request::Promise;

pub use types::{DataSourceError, DataSourceResult, ErrorKind, Operation, OperationOptions, WriteMethod};
pub use self::url::UrlDataSource;

/// Promise returned by data source operations.
pub type DataSourcePromise = Promise<Value, DataSourceError>;

/// A readable and possibly writable remote resource.
pub trait DataSource: Send + Sync + std::fmt::Debug {
    /// Read the resource. Never mutates remote state.
    fn get(&self, direct_model: Option<&Value>, options: &OperationOptions) -> DataSourcePromise;

    /// Write `model` to the resource, resolving with the parsed response.
    ///
    /// Rejects with [`ErrorKind::NotWritable`] without any I/O when the
    /// source is read-only.
    fn set(&self, direct_model: Option<&Value>, model: Option<&Value>, options: &OperationOptions) -> DataSourcePromise;

    fn is_writable(&self) -> bool;

    /// Dispatch by operation.
    fn perform(
        &self,
        operation: Operation,
        direct_model: Option<&Value>,
        model: Option<&Value>,
        options: &OperationOptions,
    ) -> DataSourcePromise {
        match operation {
            Operation::Get => self.get(direct_model, options),
            Operation::Set => self.set(direct_model, model, options),
        }
    }
}
