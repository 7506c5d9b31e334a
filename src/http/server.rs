//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router from configured routes
//! - Wire up middleware (request ID, tracing)
//! - Create one `Request` per inbound call and run its handler with it current
//! - Await the request promise and write the response
//! - Graceful shutdown on the lifecycle broadcast
//!
//! # Design Decisions
//! - Handlers are plain `RequestHandler`s; the server owns the promise wiring
//! - Unmatched paths answer a JSON 404, unmatched methods axum's 405

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Bytes,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::Response,
    routing::MethodRouter,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{Operation, RelayConfig, RouteMethod, TimeoutConfig};
use crate::datasource::{DataSource, DataSourceError, UrlDataSource};
use crate::http::request::decode_body;
use crate::http::response::{error_response, settlement_response};
use crate::observability::metrics;
use crate::relay::RelayHandler;
use crate::request::{Request, RequestError, RequestHandler, RequestId, WaitError};

/// Errors assembling the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to create data source '{name}': {source}")]
    DataSource {
        name: String,
        #[source]
        source: DataSourceError,
    },

    #[error("Route '{route}' references unknown data source '{data_source}'")]
    UnknownDataSource { route: String, data_source: String },

    #[error("Duplicate route {method:?} {path}")]
    DuplicateRoute { method: RouteMethod, path: String },
}

/// HTTP server relaying inbound requests to handlers.
pub struct HttpServer {
    routes: BTreeMap<String, MethodRouter>,
    registered: HashSet<(String, RouteMethod)>,
    request_timeout: Duration,
}

impl HttpServer {
    /// Create a server with no routes.
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        Self {
            routes: BTreeMap::new(),
            registered: HashSet::new(),
            request_timeout: Duration::from_secs(timeouts.request_secs),
        }
    }

    /// Build a server relaying every configured route through its data source.
    pub fn from_config(config: &RelayConfig) -> Result<Self, ServerError> {
        let mut sources: BTreeMap<&str, Arc<dyn DataSource>> = BTreeMap::new();
        for source_config in &config.data_sources {
            let source = UrlDataSource::new(source_config.clone(), config.retries.clone()).map_err(|source| {
                ServerError::DataSource {
                    name: source_config.name.clone(),
                    source,
                }
            })?;
            sources.insert(source_config.name.as_str(), Arc::new(source));
        }

        let mut server = Self::new(&config.timeouts);
        for route in &config.routes {
            let data_source = sources
                .get(route.data_source.as_str())
                .cloned()
                .ok_or_else(|| ServerError::UnknownDataSource {
                    route: route.name.clone(),
                    data_source: route.data_source.clone(),
                })?;
            let handler = match route.operation {
                Operation::Get => RelayHandler::read(data_source),
                Operation::Set => RelayHandler::write(data_source, route.write_method),
            };
            tracing::info!(
                route = %route.name,
                method = ?route.method,
                path = %route.path,
                operation = %route.operation,
                data_source = %route.data_source,
                "Route registered"
            );
            server = server.route(&route.path, route.method, Arc::new(handler))?;
        }
        Ok(server)
    }

    /// Bind `handler` to `method` on `path`.
    pub fn route(
        mut self,
        path: &str,
        method: RouteMethod,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<Self, ServerError> {
        if !self.registered.insert((path.to_string(), method)) {
            return Err(ServerError::DuplicateRoute {
                method,
                path: path.to_string(),
            });
        }

        let request_timeout = self.request_timeout;
        let endpoint = move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| {
            let handler = handler.clone();
            async move { dispatch(handler, request_timeout, method, uri, headers, body).await }
        };

        let methods = self.routes.remove(path).unwrap_or_else(MethodRouter::new);
        self.routes.insert(path.to_string(), methods.on(method.filter(), endpoint));
        Ok(self)
    }

    /// Assemble the Axum router with all middleware layers.
    pub fn into_router(self) -> Router {
        let mut router = Router::new();
        for (path, methods) in self.routes {
            router = router.route(&path, methods);
        }

        router.fallback(not_found).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.into_router())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!(address = %addr, "HTTP server stopped");
        Ok(())
    }
}

/// Run one inbound request through `handler`.
async fn dispatch(
    handler: Arc<dyn RequestHandler>,
    request_timeout: Duration,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let request_id = RequestId::from_headers(&headers);

    let response = match decode_body(&headers, &body) {
        Ok(model) => {
            let request = Request::new(request_id.clone(), method.clone(), uri.path(), model);
            tracing::debug!(
                request_id = %request_id,
                method = %method,
                path = %uri.path(),
                "Dispatching request"
            );
            request.enter(|| handler.handle_request(&request));
            let outcome = match request.promise().wait_timeout(request_timeout).await {
                Err(WaitError::TimedOut(limit)) => {
                    // Settle so on_error fires; a settlement racing the deadline still wins.
                    request.promise().reject(RequestError::Timeout(limit));
                    request.promise().wait().await
                }
                outcome => outcome,
            };
            settlement_response(&request_id, outcome)
        }
        Err(e) => settlement_response(&request_id, Err(WaitError::Rejected(e))),
    };

    metrics::record_request(&method, response.status().as_u16(), start);
    response
}

async fn not_found(method: Method, uri: Uri) -> Response {
    tracing::warn!(method = %method, path = %uri.path(), "No route matched");
    error_response(StatusCode::NOT_FOUND, &format!("No route for {} {}", method, uri.path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DataSourceConfig, RouteConfig};
    use crate::context::invoke_later;
    use axum::body::Body;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use tower::ServiceExt;

    fn timeouts(request_secs: u64) -> TimeoutConfig {
        TimeoutConfig { request_secs }
    }

    async fn call(router: Router, method: Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = axum::http::Request::builder().method(method).uri(path);
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = router.oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_deferred_resolution_is_returned() {
        let handler = |request: &Request| {
            let promise = request.promise().clone();
            invoke_later(move || {
                promise.resolve(json!(42));
            });
        };
        let router = HttpServer::new(&timeouts(5))
            .route("/endpoint", RouteMethod::Get, Arc::new(handler))
            .unwrap()
            .into_router();

        let (status, body) = call(router, Method::GET, "/endpoint", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(42));
    }

    #[tokio::test]
    async fn test_body_reaches_handler() {
        let handler = |request: &Request| {
            request.promise().resolve(json!({"echo": request.body().cloned()}));
        };
        let router = HttpServer::new(&timeouts(5))
            .route("/echo", RouteMethod::Post, Arc::new(handler))
            .unwrap()
            .into_router();

        let (status, body) = call(router, Method::POST, "/echo", Some(json!({"setModel": 20}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"echo": {"setModel": 20}}));
    }

    #[tokio::test]
    async fn test_rejection_maps_status() {
        let handler = |request: &Request| {
            request
                .promise()
                .reject(RequestError::handler(StatusCode::CONFLICT, "already there"));
        };
        let router = HttpServer::new(&timeouts(5))
            .route("/conflict", RouteMethod::Put, Arc::new(handler))
            .unwrap()
            .into_router();

        let (status, body) = call(router, Method::PUT, "/conflict", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body, json!({"isError": true, "message": "already there"}));
    }

    #[tokio::test]
    async fn test_unsettled_request_times_out() {
        let handler = |_request: &Request| {};
        let router = HttpServer::new(&timeouts(1))
            .route("/never", RouteMethod::Get, Arc::new(handler))
            .unwrap()
            .into_router();

        let (status, body) = call(router, Method::GET, "/never", None).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["isError"], json!(true));
    }

    #[tokio::test]
    async fn test_timeout_rejects_request_and_fires_on_error() {
        let fired = Arc::new(Mutex::new(None));
        let seen = fired.clone();
        let handler = move |request: &Request| {
            let seen = seen.clone();
            request.events().on_error.add_listener(move |error: &RequestError| {
                *seen.lock().unwrap() = Some(error.status());
            });
        };
        let router = HttpServer::new(&timeouts(1))
            .route("/stalled", RouteMethod::Get, Arc::new(handler))
            .unwrap()
            .into_router();

        let (status, body) = call(router, Method::GET, "/stalled", None).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert!(body["message"].as_str().unwrap().contains("not settled"));
        assert_eq!(*fired.lock().unwrap(), Some(StatusCode::GATEWAY_TIMEOUT));
    }

    #[tokio::test]
    async fn test_unknown_path_is_json_404() {
        let router = HttpServer::new(&timeouts(5)).into_router();
        let (status, body) = call(router, Method::GET, "/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["isError"], json!(true));
    }

    #[test]
    fn test_duplicate_route_rejected() {
        let handler = |_request: &Request| {};
        let handler: Arc<dyn RequestHandler> = Arc::new(handler);
        let result = HttpServer::new(&timeouts(5))
            .route("/relay", RouteMethod::Get, handler.clone())
            .unwrap()
            .route("/relay", RouteMethod::Get, handler);
        assert!(matches!(result, Err(ServerError::DuplicateRoute { .. })));
    }

    #[test]
    fn test_from_config_unknown_data_source() {
        let mut config = RelayConfig::default();
        config.data_sources.push(DataSourceConfig {
            name: "relay".into(),
            url: "http://localhost:8085/endpoint".into(),
            ..DataSourceConfig::default()
        });
        config.routes.push(RouteConfig {
            name: "get".into(),
            path: "/relay".into(),
            method: RouteMethod::Get,
            operation: Operation::Get,
            data_source: "other".into(),
            write_method: None,
        });
        assert!(matches!(
            HttpServer::from_config(&config),
            Err(ServerError::UnknownDataSource { .. })
        ));
    }
}
