//! HTTP request handlers

use crate::api::server::AppContext;
use crate::error::Error;
use crate::world::CycleOutcome;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rtw_common::messages::{DangerSnapshot, DetectionFrame, WorldSnapshot};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use tracing::{info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    frames_received: u64,
    merges: u64,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Serialize)]
pub struct ModulesResponse {
    modules: Vec<serde_json::Value>,
    failures: u64,
}

type ApiError = (StatusCode, Json<StatusResponse>);

fn api_error(err: Error) -> ApiError {
    let status = match err {
        Error::BadRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(StatusResponse {
            status: format!("error: {}", err),
        }),
    )
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "rtw-world".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        frames_received: ctx.state.frames_received.load(Ordering::Relaxed),
        merges: ctx.state.merges.load(Ordering::Relaxed),
    })
}

// ============================================================================
// World Endpoints
// ============================================================================

/// POST /api/v1/detection - Absorb one camera frame
pub async fn ingest_detection(
    State(ctx): State<AppContext>,
    Json(frame): Json<DetectionFrame>,
) -> Json<CycleOutcome> {
    Json(ctx.state.ingest(&frame).await)
}

/// GET /api/v1/world - Current fused snapshot
pub async fn get_world(State(ctx): State<AppContext>) -> Json<WorldSnapshot> {
    Json(ctx.state.export().await)
}

/// POST /api/v1/world/consume - Snapshot once per merge, 204 otherwise
pub async fn consume_world(State(ctx): State<AppContext>) -> Response {
    match ctx.state.consume().await {
        Some(snapshot) => Json(snapshot).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// POST /api/v1/world/reset
pub async fn reset_world(State(ctx): State<AppContext>) -> Json<StatusResponse> {
    info!("Reset requested over HTTP");
    ctx.state.reset().await;
    Json(StatusResponse {
        status: "ok".to_string(),
    })
}

// ============================================================================
// Danger & Modules
// ============================================================================

/// Danger lists must name each robot at most once
fn validate_danger(danger: &DangerSnapshot) -> Result<(), Error> {
    let mut seen = HashSet::new();
    for id in &danger.danger_list {
        if !seen.insert(*id) {
            return Err(Error::BadRequest(format!("robot {} listed twice in danger_list", id)));
        }
    }
    if let Some((id, score)) = danger.scores.iter().find(|(_, s)| !s.is_finite()) {
        return Err(Error::BadRequest(format!("score for robot {} is not finite: {}", id, score)));
    }
    Ok(())
}

/// POST /api/v1/danger - Publish a danger assessment
pub async fn publish_danger(
    State(ctx): State<AppContext>,
    Json(danger): Json<DangerSnapshot>,
) -> Result<Json<StatusResponse>, ApiError> {
    if let Err(e) = validate_danger(&danger) {
        warn!("Rejected danger assessment: {}", e);
        return Err(api_error(e));
    }

    ctx.state.publish_danger(danger);
    Ok(Json(StatusResponse {
        status: "ok".to_string(),
    }))
}

/// GET /api/v1/modules - Registered tracker modules and their output
pub async fn list_modules(State(ctx): State<AppContext>) -> Json<ModulesResponse> {
    Json(ModulesResponse {
        modules: ctx.state.module_summaries().await,
        failures: ctx.state.module_failures.load(Ordering::Relaxed),
    })
}
