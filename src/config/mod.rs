//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → data sources and routes built once at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::RelayConfig;
pub use schema::ListenerConfig;
pub use schema::{DataSourceConfig, RouteConfig, RouteMethod};
pub use schema::{ObservabilityConfig, RetryConfig, TimeoutConfig};
pub use schema::{Operation, WriteMethod};
