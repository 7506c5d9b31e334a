//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{extract::Path, routing::get, Json, Router};
use datasource_relay::config::{RelayConfig, RouteMethod};
use datasource_relay::context::invoke_later;
use datasource_relay::request::Request;
use datasource_relay::{HttpServer, Shutdown};
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Bind an ephemeral local port before anything is spawned.
pub async fn bind_local() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// A source server answering `/endpoint` the way a remote data source would.
pub struct SourceServer {
    pub addr: SocketAddr,
    /// Request ids seen by the source, in arrival order.
    pub seen_ids: Arc<Mutex<Vec<String>>>,
    /// Bodies received on writes.
    pub seen_bodies: Arc<Mutex<Vec<Option<Value>>>>,
    _shutdown: Shutdown,
}

impl SourceServer {
    pub fn url(&self) -> String {
        format!("http://{}/endpoint", self.addr)
    }
}

/// Start a source server whose handlers resolve from a deferred task:
/// GET → `42`, POST → `{"payload":"post return value"}`, PUT → `{"payload":"put return value"}`.
pub async fn start_source_server() -> SourceServer {
    let (listener, addr) = bind_local().await;
    let seen_ids = Arc::new(Mutex::new(Vec::new()));
    let seen_bodies = Arc::new(Mutex::new(Vec::new()));

    let deferred = |value: Value, ids: Arc<Mutex<Vec<String>>>, bodies: Arc<Mutex<Vec<Option<Value>>>>| {
        move |request: &Request| {
            ids.lock().unwrap().push(request.id().to_string());
            bodies.lock().unwrap().push(request.body().cloned());
            let promise = request.promise().clone();
            let value = value.clone();
            invoke_later(move || {
                promise.resolve(value);
            });
        }
    };

    let server = HttpServer::new(&RelayConfig::default().timeouts)
        .route(
            "/endpoint",
            RouteMethod::Get,
            Arc::new(deferred(json!(42), seen_ids.clone(), seen_bodies.clone())),
        )
        .unwrap()
        .route(
            "/endpoint",
            RouteMethod::Post,
            Arc::new(deferred(
                json!({"payload": "post return value"}),
                seen_ids.clone(),
                seen_bodies.clone(),
            )),
        )
        .unwrap()
        .route(
            "/endpoint",
            RouteMethod::Put,
            Arc::new(deferred(
                json!({"payload": "put return value"}),
                seen_ids.clone(),
                seen_bodies.clone(),
            )),
        )
        .unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });

    SourceServer {
        addr,
        seen_ids,
        seen_bodies,
        _shutdown: shutdown,
    }
}

/// Start a relay built from `config` on an ephemeral port.
pub async fn start_relay(config: RelayConfig) -> (SocketAddr, Shutdown) {
    let (listener, addr) = bind_local().await;
    let server = HttpServer::from_config(&config).unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });
    (addr, shutdown)
}

/// A mock backend counting hits; `/slow/{ms}` answers `{"delay": ms}` after sleeping.
pub struct MockBackend {
    pub addr: SocketAddr,
    pub hits: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn hit_count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

pub async fn start_mock_backend() -> MockBackend {
    let (listener, addr) = bind_local().await;
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = hits.clone();
    let any_hit = hits.clone();
    let app = Router::new()
        .route(
            "/slow/{ms}",
            get(move |Path(ms): Path<u64>| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    Json(json!({"delay": ms}))
                }
            }),
        )
        .fallback(move || {
            let any_hit = any_hit.clone();
            async move {
                any_hit.fetch_add(1, Ordering::SeqCst);
                Json(json!({"unexpected": true}))
            }
        });

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend { addr, hits }
}
