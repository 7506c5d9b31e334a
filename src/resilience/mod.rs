//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Data source read:
//!     → retries.rs (is the failure worth another attempt?)
//!     → backoff.rs (how long to wait before it)
//! ```
//!
//! # Design Decisions
//! - Only reads are retried; writes surface their first failure
//! - Jittered backoff prevents thundering herd
//! - Outbound deadlines are enforced by the data source's HTTP client

pub mod backoff;
pub mod retries;
