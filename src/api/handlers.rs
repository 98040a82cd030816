//! HTTP request handlers

use super::sse::{turn_stream, TurnStreamEvent};
use super::types::{ConversationRequest, ConversationResponse, DeleteResponse, ErrorResponse};
use super::AppState;
use crate::conversation::Message;
use crate::session::SessionError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/travel/chat", post(chat))
        .route("/travel/chat/stream", post(chat_stream))
        .route(
            "/travel/conversations/:id",
            get(get_conversation).delete(delete_conversation),
        )
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Chat
// ============================================================

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ConversationRequest>,
) -> Result<Json<ConversationResponse>, AppError> {
    validate(&req)?;
    let outcome = state.session.chat(req.conversation_id, req.message).await?;
    Ok(Json(outcome.into()))
}

async fn chat_stream(
    State(state): State<AppState>,
    Json(req): Json<ConversationRequest>,
) -> Result<Response, AppError> {
    validate(&req)?;

    let cancel = CancellationToken::new();
    let cancel_on_drop = cancel.clone().drop_guard();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let chunks = tx.clone();
        let result = state
            .session
            .chat_streaming(
                req.conversation_id,
                req.message,
                move |text| {
                    let _ = chunks.send(TurnStreamEvent::Delta(text));
                },
                cancel,
            )
            .await;

        let last = match result {
            Ok(outcome) => TurnStreamEvent::Done(outcome.into()),
            Err(e) => TurnStreamEvent::Error(e.to_string()),
        };
        let _ = tx.send(last);
    });

    Ok(turn_stream(rx, cancel_on_drop).into_response())
}

/// Blank messages are rejected rather than stored as an empty user turn.
fn validate(req: &ConversationRequest) -> Result<(), AppError> {
    if req.message.trim().is_empty() {
        return Err(AppError::BadRequest("message must not be empty".to_string()));
    }
    Ok(())
}

// ============================================================
// Conversations
// ============================================================

async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Message>>, AppError> {
    Ok(Json(state.session.history(&id).await?))
}

async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    state.session.delete(&id).await?;
    Ok(Json(DeleteResponse::deleted()))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("travel-agent ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        let message = err.to_string();
        match err {
            SessionError::NotFound(_) => AppError::NotFound(message),
            SessionError::ProtocolViolation(_) => AppError::Conflict(message),
            SessionError::AgentUnavailable(_)
            | SessionError::TimedOut
            | SessionError::Cancelled
            | SessionError::InvalidTransition(_) => AppError::Internal(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
