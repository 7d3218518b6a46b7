//! Proxy router: `/healthz` and `/sync` handled locally, everything else
//! forwarded verbatim to the `bw serve` API.

use crate::exec::CommandRunner;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

type HttpClient = Client<HttpConnector, Body>;

/// Shared state for the proxy server.
#[derive(Clone)]
pub struct ProxyState {
    pub runner: Arc<dyn CommandRunner>,
    /// Session token forwarded to every `bw sync` child.
    pub session: Arc<str>,
    /// Internal port `bw serve` listens on.
    pub serve_port: u16,
    http: HttpClient,
    /// Overlapping `/sync` calls (manual racing the periodic loop) are
    /// serialized here; `bw sync` is not documented safe under concurrent
    /// invocation against the same data directory.
    sync_lock: Arc<Mutex<()>>,
}

impl ProxyState {
    pub fn new(runner: Arc<dyn CommandRunner>, session: impl Into<Arc<str>>, serve_port: u16) -> Self {
        Self {
            runner,
            session: session.into(),
            serve_port,
            http: Client::builder(TokioExecutor::new()).build_http(),
            sync_lock: Arc::new(Mutex::new(())),
        }
    }
}

/// Build the proxy router. The route table is fixed at startup: two local
/// handlers, then a catch-all reverse proxy.
pub fn build_routes(state: ProxyState) -> Router {
    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/sync", post(sync_handler))
        .fallback(proxy_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness of the sidecar itself, independent of vault state.
async fn healthz_handler() -> &'static str {
    "OK"
}

async fn sync_handler(State(state): State<ProxyState>) -> Response {
    let _guard = state.sync_lock.lock().await;

    info!("Executing 'bw sync'...");
    let result = state
        .runner
        .run("bw", &["sync"], &[("BW_SESSION", &*state.session)])
        .await;

    match result {
        Ok(out) if out.success => {
            info!("Sync successful.");
            (StatusCode::OK, "Sync successful").into_response()
        }
        Ok(out) => {
            error!("Sync failed: {}", out.combined.trim());
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Sync failed: {}", out.combined),
            )
                .into_response()
        }
        Err(e) => {
            error!("Sync failed to execute: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Sync failed: {e}"),
            )
                .into_response()
        }
    }
}

/// Forward the request as-is to `bw serve`, preserving method, headers, and
/// body. Only the URI authority is rewritten; the response streams back
/// unmodified.
async fn proxy_handler(State(state): State<ProxyState>, mut req: Request) -> Response {
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let target = format!("http://127.0.0.1:{}{}", state.serve_port, path_and_query);

    match target.parse::<Uri>() {
        Ok(uri) => *req.uri_mut() = uri,
        Err(e) => {
            error!("Failed to build upstream URI for {path_and_query}: {e}");
            return StatusCode::BAD_REQUEST.into_response();
        }
    }

    match state.http.request(req).await {
        Ok(resp) => resp.map(Body::new).into_response(),
        Err(e) => {
            error!("Proxy request to bw serve failed: {e}");
            (StatusCode::BAD_GATEWAY, "bw serve unreachable").into_response()
        }
    }
}
