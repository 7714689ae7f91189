// ABOUTME: HTTP server exposing liveness and Prometheus metrics.
// ABOUTME: GET /health reports the Socket Mode connection state; GET /metrics renders counters.

use crate::platform::{ConnectionState, ConnectionStatus};
use anyhow::{Context, Result};
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use threadline_core::config::ServerConfig;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct ServerState {
    pub connection: ConnectionStatus,
    pub metrics: PrometheusHandle,
    pub bot_user_id: String,
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("connection", &self.connection)
            .field("metrics", &"<PrometheusHandle>")
            .field("bot_user_id", &self.bot_user_id)
            .finish()
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub bot_user_id: String,
    pub socket_mode: ConnectionState,
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until the process exits
pub async fn serve(config: &ServerConfig, state: ServerState) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind health server on {}", addr))?;
    tracing::info!(addr = %addr, "Starting health server");

    axum::serve(listener, router(state))
        .await
        .context("Health server stopped")?;
    Ok(())
}

/// 200 while Socket Mode is connected, 503 otherwise
async fn health_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let socket_mode = state.connection.get();
    let connected = socket_mode == ConnectionState::Connected;
    let body = HealthResponse {
        status: if connected { "ok" } else { "degraded" },
        bot_user_id: state.bot_user_id.clone(),
        socket_mode,
    };
    let code = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(body))
}

async fn metrics_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    state.metrics.render()
}
