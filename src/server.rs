//! # HTTP Server
//!
//! HTTP server for lifecycle events, edge rewrites, metrics and health checks.
//!
//! Provides endpoints:
//! - `POST /events` - Handle a lifecycle event and deliver its terminal report
//!   (400 when the body names no `ResponseURL`, 502 when delivery fails)
//! - `POST /rewrite` - Apply the directory-root rewrite to a request
//! - `/metrics` - Prometheus metrics in text format
//! - `/healthz` - Liveness probe (always returns 200)
//! - `/readyz` - Readiness probe (returns 200 once the provider is initialized)
//!
//! The server runs on port 8080 by default (configurable via `METRICS_PORT` environment variable).

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::VerifierConfig;
use crate::dispatcher::{handle_event_value, EventError};
use crate::observability::metrics;
use crate::provider::IdentityProvider;
use crate::reconciler::Reconciler;
use crate::reporter::ResponseReporter;
use crate::rewrite::{rewrite, RewriteInput};

pub struct ServerState {
    pub is_ready: Arc<AtomicBool>,
    pub provider: Arc<dyn IdentityProvider>,
    pub reporter: Arc<dyn ResponseReporter>,
    pub config: VerifierConfig,
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("is_ready", &self.is_ready.load(Ordering::Relaxed))
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ServerState {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        reporter: Arc<dyn ResponseReporter>,
        config: VerifierConfig,
    ) -> Self {
        Self {
            is_ready: Arc::new(AtomicBool::new(false)),
            provider,
            reporter,
            config,
        }
    }

    pub fn mark_ready(&self) {
        self.is_ready.store(true, Ordering::Relaxed);
    }
}

/// Build the application router
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/events", post(events_handler))
        .route("/rewrite", post(rewrite_handler))
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(port: u16, state: Arc<ServerState>) -> Result<(), anyhow::Error> {
    let app = router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn events_handler(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let reconciler = Reconciler::new(state.provider.as_ref())
        .with_compensation(state.config.compensate_failed_update);

    match handle_event_value(&body, &reconciler, state.reporter.as_ref()).await {
        Ok(report) => (StatusCode::OK, Json(json!(report))),
        Err(e @ EventError::MissingResponseUrl(_)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        ),
        Err(e @ EventError::Report(_)) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": e.to_string() })),
        ),
    }
}

async fn rewrite_handler(
    State(state): State<Arc<ServerState>>,
    Json(input): Json<RewriteInput>,
) -> impl IntoResponse {
    Json(rewrite(input, &state.config.default_index_document))
}

async fn metrics_handler() -> impl IntoResponse {
    match metrics::gather_text() {
        Ok(buffer) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {e}").into_bytes(),
            )
        }
    }
}

async fn healthz_handler() -> impl IntoResponse {
    StatusCode::OK
}

async fn readyz_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    if state.is_ready.load(Ordering::Relaxed) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
