//! Session endpoints
//!
//! Every browser interaction is a request against one session: JSON events,
//! raw WAV captures, and message audio downloads.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use uuid::Uuid;

use super::ApiState;
use crate::chat::{ClientEvent, Outcome};
use crate::session::{SessionHandle, SessionSnapshot};

/// Largest accepted capture (about ten minutes of 16 kHz mono LINEAR16)
const MAX_CAPTURE_BYTES: usize = 20 * 1024 * 1024;

/// Build sessions router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", post(create_session))
        .route("/{id}", get(get_session).delete(delete_session))
        .route("/{id}/events", post(post_event))
        .route(
            "/{id}/audio",
            post(post_audio).layer(DefaultBodyLimit::max(MAX_CAPTURE_BYTES)),
        )
        .route("/{id}/messages/{index}/audio", get(message_audio))
        .with_state(state)
}

/// Session API error
#[derive(Debug)]
pub enum SessionError {
    NotFound(Uuid),
    MessageNotFound(usize),
    SynthesisUnavailable,
    SynthesisFailed(String),
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: ErrorBody,
        }

        #[derive(Serialize)]
        struct ErrorBody {
            code: &'static str,
            message: String,
        }

        let (status, code, message) = match self {
            Self::NotFound(id) => (
                StatusCode::NOT_FOUND,
                "session_not_found",
                format!("no session with id {id}"),
            ),
            Self::MessageNotFound(index) => (
                StatusCode::NOT_FOUND,
                "message_not_found",
                format!("there is no message {index}"),
            ),
            Self::SynthesisUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "not_configured",
                "speech synthesis is not configured".to_string(),
            ),
            Self::SynthesisFailed(msg) => (StatusCode::BAD_GATEWAY, "synthesis_failed", msg),
        };

        (
            status,
            Json(ErrorResponse {
                error: ErrorBody { code, message },
            }),
        )
            .into_response()
    }
}

async fn lookup(state: &ApiState, id: Uuid) -> Result<SessionHandle, SessionError> {
    state.sessions.get(id).await.ok_or(SessionError::NotFound(id))
}

/// Map an outcome to a response; guard rejections become `409 Conflict`
fn outcome_response(outcome: Outcome) -> Response {
    let status = if outcome.accepted {
        StatusCode::OK
    } else {
        StatusCode::CONFLICT
    };
    (status, Json(outcome)).into_response()
}

/// Create a session with default personality and language
async fn create_session(
    State(state): State<Arc<ApiState>>,
) -> (StatusCode, Json<SessionSnapshot>) {
    let (_, handle) = state.sessions.create().await;
    let snapshot = handle.lock().await.snapshot();
    (StatusCode::CREATED, Json(snapshot))
}

async fn get_session(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, SessionError> {
    let handle = lookup(&state, id).await?;
    let snapshot = handle.lock().await.snapshot();
    Ok(Json(snapshot))
}

async fn delete_session(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, SessionError> {
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(SessionError::NotFound(id))
    }
}

/// Apply a JSON client event
async fn post_event(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(event): Json<ClientEvent>,
) -> Result<Response, SessionError> {
    let handle = lookup(&state, id).await?;
    let outcome = state.handler.handle(&handle, event).await;
    Ok(outcome_response(outcome))
}

/// Deliver a finished recording (WAV body)
async fn post_audio(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Response, SessionError> {
    let handle = lookup(&state, id).await?;
    tracing::debug!(session = %id, bytes = body.len(), "capture received");

    let event = ClientEvent::AudioCaptured {
        audio: body.to_vec(),
    };
    let outcome = state.handler.handle(&handle, event).await;
    Ok(outcome_response(outcome))
}

/// Audio for one message, synthesized on first request
async fn message_audio(
    State(state): State<Arc<ApiState>>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Response, SessionError> {
    let handle = lookup(&state, id).await?;
    let outcome = state
        .handler
        .handle(&handle, ClientEvent::SpeakMessage { index })
        .await;

    if let Some(audio) = outcome.audio {
        return Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response());
    }

    if index >= outcome.session.messages.len() {
        return Err(SessionError::MessageNotFound(index));
    }
    if !state.handler.tts_available() {
        return Err(SessionError::SynthesisUnavailable);
    }

    let message = outcome
        .notices
        .into_iter()
        .next()
        .map_or_else(|| "speech synthesis failed".to_string(), |n| n.text);
    Err(SessionError::SynthesisFailed(message))
}
