// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer token middleware for the `/v1` routes.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

/// Authentication configuration for the gateway.
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Expected bearer token. `None` leaves the routes open, which config
    /// validation only permits on loopback binds.
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

/// Rejects requests whose `Authorization: Bearer` header does not match.
pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = auth.bearer_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let presented = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == expected => Ok(next.run(request).await),
        _ => {
            tracing::debug!(path = %request.uri().path(), "rejected unauthenticated request");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
