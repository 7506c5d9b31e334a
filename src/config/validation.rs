//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference existing data sources)
//! - Validate value ranges and URLs
//! - Detect conflicting routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{Operation, RelayConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("timeout '{0}' must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("retries.max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("data source name '{0}' is empty or duplicated")]
    DataSourceName(String),

    #[error("data source '{name}' has invalid url '{url}': {reason}")]
    DataSourceUrl { name: String, url: String, reason: String },

    #[error("route '{route}' references unknown data source '{data_source}'")]
    UnknownDataSource { route: String, data_source: String },

    #[error("route '{0}' path must start with '/'")]
    RoutePath(String),

    #[error("route '{route}' duplicates {method} {path}")]
    DuplicateRoute { route: String, method: String, path: String },
}

/// `ip:port` or `host:port`; host names are resolved when the listener binds.
fn is_bind_address(addr: &str) -> bool {
    if addr.parse::<SocketAddr>().is_ok() {
        return true;
    }
    match addr.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && !host.contains(':') && port.parse::<u16>().is_ok(),
        None => false,
    }
}

/// Validate `config`, collecting every error.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !is_bind_address(&config.listener.bind_address) {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("timeouts.request_secs"));
    }
    if config.retries.enabled && config.retries.max_attempts == 0 {
        errors.push(ValidationError::ZeroAttempts);
    }

    let mut names = HashSet::new();
    for source in &config.data_sources {
        if source.name.is_empty() || !names.insert(source.name.as_str()) {
            errors.push(ValidationError::DataSourceName(source.name.clone()));
        }
        // Placeholders are not valid URL syntax everywhere; check the template with terms blanked.
        let mut blanked = source.url.clone();
        for term in source.term_map.keys() {
            blanked = blanked.replace(&format!("%{}", term), "x");
        }
        match url::Url::parse(&blanked) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            Ok(parsed) => errors.push(ValidationError::DataSourceUrl {
                name: source.name.clone(),
                url: source.url.clone(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            }),
            Err(e) => errors.push(ValidationError::DataSourceUrl {
                name: source.name.clone(),
                url: source.url.clone(),
                reason: e.to_string(),
            }),
        }
        if source.timeout_secs == 0 {
            errors.push(ValidationError::ZeroTimeout("data_sources.timeout_secs"));
        }
    }

    let mut seen_routes = HashSet::new();
    for route in &config.routes {
        if !route.path.starts_with('/') {
            errors.push(ValidationError::RoutePath(route.name.clone()));
        }
        if !seen_routes.insert((route.path.as_str(), route.method)) {
            errors.push(ValidationError::DuplicateRoute {
                route: route.name.clone(),
                method: format!("{:?}", route.method).to_uppercase(),
                path: route.path.clone(),
            });
        }
        match config.data_sources.iter().find(|s| s.name == route.data_source) {
            None => errors.push(ValidationError::UnknownDataSource {
                route: route.name.clone(),
                data_source: route.data_source.clone(),
            }),
            Some(source) if route.operation == Operation::Set && !source.writable => {
                // Allowed at runtime (rejects with NotWritable) but almost always a mistake.
                tracing::warn!(
                    route = %route.name,
                    data_source = %source.name,
                    "Route performs set on a read-only data source"
                );
            }
            Some(_) => {}
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
