use axum::{Json, extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse};
use tracing::debug;

use super::error::ApiError;
use super::models::{HealthResponse, SERVICE_NAME, ServiceInfo, WebhookAck};
use super::state::AppState;
use super::utils::{parse_content_type, read_limited, verify_secret};
use crate::telegram::Update;

/// Liveness probe (GET /health)
///
/// 202 with `initializing` until the server has finished starting up.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    if state.is_ready() {
        (StatusCode::OK, Json(HealthResponse::ok()))
    } else {
        (StatusCode::ACCEPTED, Json(HealthResponse::initializing()))
    }
}

/// Telegram webhook (POST /webhook)
///
/// The update is acknowledged as soon as it parses; link processing runs
/// on its own task so Telegram never waits on downloads.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    verify_secret(&headers, state.webhook_secret.as_deref())?;

    if let Some(content_type) = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    {
        parse_content_type(content_type)?;
    }

    let body = read_limited(body, state.max_body_bytes).await?;
    let update: Update = serde_json::from_slice(&body)?;
    state.metrics.update_received();
    debug!(update_id = update.update_id, "update accepted");

    let dispatcher = state.dispatcher.clone();
    state.spawn(async move {
        dispatcher.dispatch(&update).await;
    });

    Ok(Json(WebhookAck { ok: true }))
}

/// Service metadata and counters (GET /)
pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    Json(ServiceInfo {
        name: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        status: if state.is_ready() { "running" } else { "initializing" },
        endpoints: vec!["GET /", "GET /health", "POST /webhook"],
        metrics: state.metrics.snapshot(),
    })
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
