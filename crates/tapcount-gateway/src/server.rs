// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.

use std::sync::Arc;

use axum::{
    extract::FromRef,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use tapcount_config::model::GatewayConfig;
use tapcount_core::TapcountError;
use tapcount_scheduler::UpdateScheduler;

use crate::auth::{auth_middleware, AuthConfig};
use crate::handlers;

/// State for the unauthenticated health and metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    pub start_time: std::time::Instant,
    /// Renders the Prometheus text exposition, when export is enabled.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub scheduler: Arc<UpdateScheduler>,
    pub auth: AuthConfig,
    pub health: HealthState,
}

impl FromRef<GatewayState> for HealthState {
    fn from_ref(state: &GatewayState) -> Self {
        state.health.clone()
    }
}

/// Address the gateway binds to.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl From<&GatewayConfig> for ServerConfig {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
        }
    }
}

/// Build the full route table.
pub fn router(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_public_health))
        .route("/metrics", get(handlers::get_public_metrics))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/sessions", post(handlers::post_session))
        .route("/v1/sessions/heartbeat", post(handlers::post_heartbeat))
        .route("/v1/sessions/end", post(handlers::post_end_session))
        .route("/v1/activity", post(handlers::post_activity))
        .route("/v1/queue", get(handlers::get_queue))
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
}

/// Serve until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), TapcountError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| TapcountError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| TapcountError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}
