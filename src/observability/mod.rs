//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters and histograms)
//!
//! Consumers:
//!     → stdout log stream, filtered by RUST_LOG or config
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID is attached to every log line that concerns a request
//! - Metrics are cheap (atomic increments); the exporter is opt-in

pub mod logging;
pub mod metrics;
