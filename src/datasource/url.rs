//! HTTP-backed data source.
//!
//! # Responsibilities
//! - Issue `get` as GET and `set` with the configured or overridden write method
//! - Serialize write payloads as JSON
//! - Retry idempotent reads on connection failures and 502/503/504
//! - Settle the returned promise with the calling request restored
//!
//! # Design Decisions
//! - The HTTP exchange runs on a detached task with no request context; only
//!   the completion callback, wrapped at issue time, re-enters it
//! - One `reqwest::Client` per data source so connections are pooled
//! - Writes are never retried

use std::time::{Duration, Instant};

use axum::http::{header, Method};
use serde_json::Value;

use crate::config::{DataSourceConfig, RetryConfig};
use crate::context;
use crate::datasource::payload::{self, RawResponse};
use crate::datasource::template::resolve_url;
use crate::datasource::types::{DataSourceError, DataSourceResult, Operation, OperationOptions};
use crate::datasource::{DataSource, DataSourcePromise};
use crate::observability::metrics;
use crate::request::{RequestId, X_REQUEST_ID};
use crate::resilience::backoff::retry_delay;
use crate::resilience::retries::{is_retryable_error, is_retryable_status};

/// One outbound exchange, fully resolved at issue time.
#[derive(Debug, Clone)]
struct Outbound {
    operation: Operation,
    method: Method,
    url: String,
    body: Option<String>,
    request_id: Option<RequestId>,
}

/// A data source backed by a remote HTTP endpoint.
#[derive(Clone)]
pub struct UrlDataSource {
    config: DataSourceConfig,
    retries: RetryConfig,
    client: reqwest::Client,
}

impl UrlDataSource {
    /// Create a data source with its own connection pool.
    pub fn new(config: DataSourceConfig, retries: RetryConfig) -> DataSourceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DataSourceError::from_reqwest(&Method::GET, &config.url, e))?;
        Ok(Self::with_client(config, retries, client))
    }

    /// Create a data source sharing an existing client.
    pub fn with_client(config: DataSourceConfig, retries: RetryConfig, client: reqwest::Client) -> Self {
        tracing::debug!(
            name = %config.name,
            url = %config.url,
            writable = config.writable,
            write_method = %config.write_method,
            "URL data source created"
        );
        Self {
            config,
            retries,
            client,
        }
    }

    pub fn config(&self) -> &DataSourceConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Schedule `outbound` and return the promise its completion settles.
    fn issue(&self, outbound: Outbound) -> DataSourcePromise {
        let promise = DataSourcePromise::new();
        let settle = {
            let promise = promise.clone();
            context::wrap_callback(move |outcome: DataSourceResult<Value>| {
                promise.settle(outcome);
            })
        };

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                settle(Err(DataSourceError::Transport {
                    method: outbound.method.to_string(),
                    url: outbound.url,
                    status: None,
                    message: format!("no async runtime available: {}", e),
                    cause: None,
                }));
                return promise;
            }
        };

        tracing::debug!(
            request_id = ?outbound.request_id.as_ref().map(RequestId::as_str),
            operation = %outbound.operation,
            method = %outbound.method,
            url = %outbound.url,
            "Issuing data source request"
        );

        let client = self.client.clone();
        let retries = self.retries.clone();
        runtime.spawn(async move {
            let outcome = execute(&client, &retries, &outbound).await;
            settle(outcome);
        });

        promise
    }
}

impl DataSource for UrlDataSource {
    fn get(&self, direct_model: Option<&Value>, _options: &OperationOptions) -> DataSourcePromise {
        self.issue(Outbound {
            operation: Operation::Get,
            method: Method::GET,
            url: resolve_url(&self.config.url, &self.config.term_map, direct_model),
            body: None,
            request_id: current_request_id(),
        })
    }

    fn set(&self, direct_model: Option<&Value>, model: Option<&Value>, options: &OperationOptions) -> DataSourcePromise {
        if !self.config.writable {
            tracing::warn!(
                request_id = ?current_request_id().as_ref().map(RequestId::as_str),
                name = %self.config.name,
                url = %self.config.url,
                "Rejecting set on non-writable data source"
            );
            return DataSourcePromise::rejected(DataSourceError::NotWritable {
                url: self.config.url.clone(),
            });
        }

        let write_method = options.write_method.unwrap_or(self.config.write_method);
        self.issue(Outbound {
            operation: Operation::Set,
            method: write_method.as_method(),
            url: resolve_url(&self.config.url, &self.config.term_map, direct_model),
            body: model.or(direct_model).map(Value::to_string),
            request_id: current_request_id(),
        })
    }

    fn is_writable(&self) -> bool {
        self.config.writable
    }
}

impl std::fmt::Debug for UrlDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlDataSource")
            .field("name", &self.config.name)
            .field("url", &self.config.url)
            .field("writable", &self.config.writable)
            .field("write_method", &self.config.write_method)
            .finish()
    }
}

fn current_request_id() -> Option<RequestId> {
    context::current_request().map(|r| r.id().clone())
}

/// Run the exchange to completion, retrying reads where allowed.
async fn execute(client: &reqwest::Client, retries: &RetryConfig, outbound: &Outbound) -> DataSourceResult<Value> {
    let start = Instant::now();
    let max_attempts = if retries.enabled && outbound.operation == Operation::Get {
        retries.max_attempts.max(1)
    } else {
        1
    };

    let mut attempts = 0;
    let outcome = loop {
        attempts += 1;
        match send_once(client, outbound).await {
            Ok(response) => {
                if attempts < max_attempts && is_retryable_status(response.status) {
                    let delay = retry_delay(retries, attempts);
                    tracing::info!(
                        url = %outbound.url,
                        attempt = attempts,
                        delay = ?delay,
                        status = %response.status,
                        "Retrying data source read"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                break payload::check_status(&outbound.method, &outbound.url, &response).and_then(|()| {
                    match outbound.operation {
                        Operation::Get => payload::decode_read(&outbound.url, &response),
                        Operation::Set => payload::decode_write(&outbound.url, &response),
                    }
                });
            }
            Err(e) => {
                tracing::error!(url = %outbound.url, attempt = attempts, error = %e, "Data source request failed");
                if attempts < max_attempts && is_retryable_error(&e) {
                    let delay = retry_delay(retries, attempts);
                    tracing::info!(url = %outbound.url, attempt = attempts, delay = ?delay, "Retrying after network error");
                    tokio::time::sleep(delay).await;
                    continue;
                }
                break Err(DataSourceError::from_reqwest(&outbound.method, &outbound.url, e));
            }
        }
    };

    metrics::record_datasource_call(outbound.operation, &outbound.method, &outcome, start);
    outcome
}

async fn send_once(client: &reqwest::Client, outbound: &Outbound) -> Result<RawResponse, reqwest::Error> {
    let mut builder = client
        .request(outbound.method.clone(), &outbound.url)
        .header(header::ACCEPT, "application/json");
    if let Some(id) = &outbound.request_id {
        builder = builder.header(X_REQUEST_ID, id.as_str());
    }
    if let Some(body) = &outbound.body {
        builder = builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.clone());
    }

    let response = builder.send().await?;
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await?;

    Ok(RawResponse {
        status,
        content_type,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::ErrorKind;
    use crate::request::WaitError;

    fn config(writable: bool) -> DataSourceConfig {
        DataSourceConfig {
            name: "relay".into(),
            // Nothing listens here; any issued call would fail with a transport error.
            url: "http://127.0.0.1:9/endpoint".into(),
            writable,
            ..DataSourceConfig::default()
        }
    }

    #[tokio::test]
    async fn test_set_on_read_only_rejects_before_io() {
        let source = UrlDataSource::new(config(false), RetryConfig::default()).unwrap();
        let promise = source.set(None, Some(&serde_json::json!({"a": 1})), &OperationOptions::default());

        // Settled synchronously: no outbound call was scheduled.
        assert!(promise.is_settled());
        match promise.wait().await {
            Err(WaitError::Rejected(e)) => assert_eq!(e.kind(), ErrorKind::NotWritable),
            other => panic!("expected NotWritable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let retries = RetryConfig {
            enabled: false,
            ..RetryConfig::default()
        };
        let source = UrlDataSource::new(config(true), retries).unwrap();
        let outcome = source.get(None, &OperationOptions::default()).wait().await;
        match outcome {
            Err(WaitError::Rejected(e)) => {
                assert_eq!(e.kind(), ErrorKind::TransportError);
                assert!(std::error::Error::source(&e).is_some());
            }
            other => panic!("expected transport error, got {:?}", other),
        }
    }

    #[test]
    fn test_without_runtime_rejects() {
        let source = UrlDataSource::with_client(config(true), RetryConfig::default(), reqwest::Client::new());
        let outcome = source.get(None, &OperationOptions::default()).peek();
        assert!(matches!(outcome, Some(Err(ref e)) if e.kind() == ErrorKind::TransportError));
    }
}
