//! Health check endpoints

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use super::ApiState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Detailed readiness response
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub checks: ReadinessChecks,
    pub sessions: usize,
}

/// Individual readiness checks
#[derive(Serialize)]
pub struct ReadinessChecks {
    pub generation: CheckResult,
    pub stt: CheckResult,
    pub tts: CheckResult,
}

/// Result of a single health check
#[derive(Serialize)]
pub struct CheckResult {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok",
            message: Some(message.into()),
        }
    }

    fn unavailable() -> Self {
        Self {
            status: "unavailable",
            message: Some("not configured".to_string()),
        }
    }

    fn from_flag(available: bool) -> Self {
        if available {
            Self {
                status: "ok",
                message: None,
            }
        } else {
            Self::unavailable()
        }
    }
}

/// Liveness probe - is the service running?
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness probe - which services are wired up?
///
/// Voice services are optional, so their absence degrades rather than fails.
async fn ready(State(state): State<Arc<ApiState>>) -> Json<ReadinessResponse> {
    let handler = &state.handler;
    let checks = ReadinessChecks {
        generation: CheckResult::ok(format!("{} ({})", handler.generator_name(), state.model)),
        stt: CheckResult::from_flag(handler.stt_available()),
        tts: CheckResult::from_flag(handler.tts_available()),
    };

    let status = if handler.stt_available() && handler.tts_available() {
        "ready"
    } else {
        "degraded"
    };

    Json(ReadinessResponse {
        status,
        checks,
        sessions: state.sessions.len().await,
    })
}

/// Build the liveness router
pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

/// Build the readiness router
pub fn ready_router(state: Arc<ApiState>) -> Router {
    Router::new().route("/ready", get(ready)).with_state(state)
}
