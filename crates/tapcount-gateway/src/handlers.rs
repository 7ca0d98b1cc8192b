// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use tapcount_core::{SessionKey, TapcountError, Tier};
use tapcount_scheduler::{ActivityEvent, SchedulerStatus};

use crate::server::{GatewayState, HealthState};

/// Body of `POST /v1/sessions`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub user_id: i64,
    pub chat_id: i64,
    pub message_id: i32,
}

/// Body of the heartbeat and end-session routes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub user_id: i64,
    pub chat_id: i64,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub tier: Tier,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn internal(err: TapcountError) -> Response {
    tracing::error!(error = %err, "gateway request failed");
    error(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
}

/// Telegram user ids are positive; group chat ids are negative, so only
/// zero is rejected for chats.
fn session_key(user_id: i64, chat_id: i64) -> Result<SessionKey, Response> {
    if user_id <= 0 {
        return Err(error(StatusCode::BAD_REQUEST, "invalid userId"));
    }
    if chat_id == 0 {
        return Err(error(StatusCode::BAD_REQUEST, "invalid chatId"));
    }
    Ok(SessionKey::new(user_id, chat_id))
}

/// POST /v1/sessions
pub async fn post_session(
    State(state): State<GatewayState>,
    Json(body): Json<RegisterRequest>,
) -> Response {
    let key = match session_key(body.user_id, body.chat_id) {
        Ok(key) => key,
        Err(resp) => return resp,
    };
    if body.message_id <= 0 {
        return error(StatusCode::BAD_REQUEST, "invalid messageId");
    }

    match state.scheduler.register_session(key, body.message_id).await {
        Ok(tier) => (StatusCode::CREATED, Json(RegisterResponse { tier })).into_response(),
        Err(e) => internal(e),
    }
}

/// POST /v1/sessions/heartbeat
pub async fn post_heartbeat(
    State(state): State<GatewayState>,
    Json(body): Json<SessionRequest>,
) -> Response {
    let key = match session_key(body.user_id, body.chat_id) {
        Ok(key) => key,
        Err(resp) => return resp,
    };
    match state.scheduler.heartbeat(key).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => error(StatusCode::NOT_FOUND, "session not found"),
        Err(e) => internal(e),
    }
}

/// POST /v1/sessions/end
pub async fn post_end_session(
    State(state): State<GatewayState>,
    Json(body): Json<SessionRequest>,
) -> Response {
    let key = match session_key(body.user_id, body.chat_id) {
        Ok(key) => key,
        Err(resp) => return resp,
    };
    match state.scheduler.end_session(key).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => internal(e),
    }
}

/// POST /v1/activity
pub async fn post_activity(
    State(state): State<GatewayState>,
    Json(event): Json<ActivityEvent>,
) -> Response {
    if let Err(resp) = session_key(event.user_id, event.chat_id) {
        return resp;
    }
    match state.scheduler.activity_sender().try_send(event) {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {
            tracing::warn!("activity channel full, dropping event");
            error(StatusCode::SERVICE_UNAVAILABLE, "activity channel full")
        }
        Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
            error(StatusCode::SERVICE_UNAVAILABLE, "scheduler is not running")
        }
    }
}

/// GET /v1/queue
pub async fn get_queue(State(state): State<GatewayState>) -> Json<SchedulerStatus> {
    Json(state.scheduler.status().await)
}

/// GET /health
pub async fn get_public_health(State(health): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: health.start_time.elapsed().as_secs(),
    })
}

/// GET /metrics
pub async fn get_public_metrics(State(health): State<HealthState>) -> Response {
    match &health.prometheus_render {
        Some(render) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => error(StatusCode::NOT_FOUND, "metrics export disabled"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_uses_camel_case() {
        let json = r#"{"userId": 1, "chatId": -100, "messageId": 5}"#;
        let req: RegisterRequest = serde_json::from_str(json).unwrap();
        assert_eq!((req.user_id, req.chat_id, req.message_id), (1, -100, 5));
    }

    #[test]
    fn session_key_validation() {
        assert!(session_key(1, -100).is_ok());
        assert!(session_key(1, 5).is_ok());
        assert!(session_key(0, 5).is_err());
        assert!(session_key(-3, 5).is_err());
        assert!(session_key(1, 0).is_err());
    }

    #[test]
    fn register_response_serializes_tier_lowercase() {
        let json = serde_json::to_string(&RegisterResponse { tier: Tier::Medium }).unwrap();
        assert_eq!(json, r#"{"tier":"medium"}"#);
    }
}
