//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use axum::routing::MethodFilter;
use serde::{Deserialize, Serialize};

pub use crate::datasource::{Operation, WriteMethod};

/// Root configuration for the relay server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry configuration for data source reads.
    pub retries: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Named remote data sources.
    pub data_sources: Vec<DataSourceConfig>,

    /// Routes relaying inbound requests to data sources.
    pub routes: Vec<RouteConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8086").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8086".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Inbound request timeout (handler plus settlement) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries of data source reads.
    pub enabled: bool,

    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// A remote resource reached over HTTP.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataSourceConfig {
    /// Unique data source identifier, referenced by routes.
    pub name: String,

    /// Endpoint URL; may contain `%term` placeholders.
    pub url: String,

    /// Whether `set` is permitted.
    #[serde(default)]
    pub writable: bool,

    /// Method used by `set` unless overridden per call.
    #[serde(default)]
    pub write_method: WriteMethod,

    /// Placeholder term → dotted path into the direct model.
    #[serde(default)]
    pub term_map: BTreeMap<String, String>,

    /// Outbound request timeout in seconds.
    #[serde(default = "default_outbound_timeout")]
    pub timeout_secs: u64,
}

fn default_outbound_timeout() -> u64 {
    10
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            url: String::new(),
            writable: false,
            write_method: WriteMethod::default(),
            term_map: BTreeMap::new(),
            timeout_secs: default_outbound_timeout(),
        }
    }
}

/// Inbound HTTP method a route answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RouteMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl RouteMethod {
    pub fn filter(&self) -> MethodFilter {
        match self {
            RouteMethod::Get => MethodFilter::GET,
            RouteMethod::Post => MethodFilter::POST,
            RouteMethod::Put => MethodFilter::PUT,
            RouteMethod::Patch => MethodFilter::PATCH,
            RouteMethod::Delete => MethodFilter::DELETE,
        }
    }
}

/// Route configuration binding a path and method to a data source operation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging.
    pub name: String,

    /// Exact request path (e.g., "/relay").
    pub path: String,

    /// Inbound method.
    pub method: RouteMethod,

    /// Data source operation performed.
    pub operation: Operation,

    /// Name of the data source to relay through.
    pub data_source: String,

    /// Forced write method for `set` routes.
    #[serde(default)]
    pub write_method: Option<WriteMethod>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8086");
        assert_eq!(config.timeouts.request_secs, 30);
        assert!(config.retries.enabled);
        assert!(!config.observability.metrics_enabled);
        assert!(config.data_sources.is_empty());
    }

    #[test]
    fn test_deserialize_full() {
        let raw = r#"
            [listener]
            bind_address = "127.0.0.1:8086"

            [[data_sources]]
            name = "relay"
            url = "http://localhost:8085/endpoint"
            writable = true
            write_method = "POST"

            [[routes]]
            name = "put-relay"
            path = "/relay"
            method = "PUT"
            operation = "set"
            data_source = "relay"
            write_method = "PUT"
        "#;
        let config: RelayConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.data_sources[0].write_method, WriteMethod::Post);
        assert_eq!(config.data_sources[0].timeout_secs, 10);
        assert_eq!(config.routes[0].method, RouteMethod::Put);
        assert_eq!(config.routes[0].operation, Operation::Set);
        assert_eq!(config.routes[0].write_method, Some(WriteMethod::Put));
        assert_eq!(config.retries.max_attempts, 3);
    }
}
