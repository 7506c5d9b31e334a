//! Request-scoped data source relay.
//!
//! Inbound HTTP requests each own a single-settlement promise. Handlers
//! reach remote resources through [`DataSource`]s, and every asynchronous
//! callback runs with the request that scheduled it restored as the
//! current request.

pub mod config;
pub mod context;
pub mod datasource;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod relay;
pub mod request;
pub mod resilience;

pub use config::RelayConfig;
pub use context::{current_request, invoke_later, wrap_callback};
pub use datasource::{DataSource, DataSourceError, UrlDataSource};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use relay::RelayHandler;
pub use request::{Request, RequestHandler, RequestPromise};
