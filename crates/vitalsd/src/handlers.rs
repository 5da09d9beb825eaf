//! HTTP API handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use vitals_core::RegistrantInfo;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

// ── Registrants ────────────────────────────────────────────────

/// GET /api/v1/registrants
pub async fn list_registrants(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.monitor.active().await)
}

/// POST /api/v1/registrants
pub async fn register(
    State(state): State<ApiState>,
    Json(info): Json<RegistrantInfo>,
) -> impl IntoResponse {
    if info.service_name.trim().is_empty() {
        return error_response("service_name must not be empty", StatusCode::BAD_REQUEST)
            .into_response();
    }
    match state.monitor.register(info.clone()).await {
        Ok(_) => (StatusCode::CREATED, ApiResponse::ok(info)).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::BAD_REQUEST).into_response(),
    }
}

/// DELETE /api/v1/registrants/{name}
pub async fn deregister(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    if state.monitor.deregister(&name).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        error_response(&format!("not monitored: {name}"), StatusCode::NOT_FOUND).into_response()
    }
}

// ── Prometheus ─────────────────────────────────────────────────

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    let latest = state.aggregator.latest().await;
    let body = vitals_metrics::render_prometheus(&latest);
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}
