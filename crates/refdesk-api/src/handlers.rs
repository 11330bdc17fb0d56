//! Route handler functions for all API endpoints.
//!
//! Each handler extracts parameters via axum extractors, interacts with the
//! chat service through AppState, and returns JSON responses. The embedded
//! chat page is served from `/ui`.

use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use refdesk_chat::{ChatError, Message, Mode, ReplyBlock};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ModeUpdateRequest {
    pub mode: Mode,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub session_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionCreatedResponse {
    pub session_id: Uuid,
    pub mode: Mode,
    pub greeting: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatTurnResponse {
    pub session_id: Uuid,
    /// The mode snapshot the turn was dispatched under.
    pub mode: Mode,
    /// The assistant content committed to the log.
    pub content: String,
    /// Rich display payload for the browser.
    pub blocks: Vec<ReplyBlock>,
    pub log_len: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogResponse {
    pub session_id: Uuid,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModeResponse {
    pub session_id: Uuid,
    pub mode: Mode,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModeGuide {
    pub mode: Mode,
    pub label: String,
    pub description: String,
    pub example: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GuideResponse {
    pub greeting: String,
    pub modes: Vec<ModeGuide>,
}

// =============================================================================
// Handler functions
// =============================================================================

/// GET /health - liveness, version, and session count.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, session_count) = match state.service() {
        Ok(service) => ("healthy".to_string(), service.session_count()),
        Err(_) => ("initialization_failed".to_string(), 0),
    };
    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        session_count,
    })
}

/// GET /ui - the embedded chat page.
pub async fn ui() -> impl IntoResponse {
    Html(refdesk_ui::CHAT_HTML)
}

/// GET /guide - sidebar content: greeting, mode descriptions, input examples.
pub async fn guide(State(state): State<AppState>) -> Result<Json<GuideResponse>, ApiError> {
    let service = state.service()?;
    Ok(Json(GuideResponse {
        greeting: service.greeting().to_string(),
        modes: vec![
            ModeGuide {
                mode: Mode::DocSearch,
                label: Mode::DocSearch.label().to_string(),
                description: "Find where the internal documents most relevant to your \
                              message are located."
                    .to_string(),
                example: "社員の育成方針に関するMTGの議事録".to_string(),
            },
            ModeGuide {
                mode: Mode::Inquiry,
                label: Mode::Inquiry.label().to_string(),
                description: "Ask a question and get an answer grounded in the internal \
                              documents."
                    .to_string(),
                example: "人事部に所属している従業員情報を一覧化して".to_string(),
            },
        ],
    }))
}

/// POST /sessions - create a fresh conversation session.
pub async fn create_session(
    State(state): State<AppState>,
) -> Result<Json<SessionCreatedResponse>, ApiError> {
    let service = state.service()?;
    let (session_id, mode) = service.create_session()?;
    Ok(Json(SessionCreatedResponse {
        session_id,
        mode,
        greeting: service.greeting().to_string(),
    }))
}

/// POST /chat - submit one message and commit one turn.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatTurnResponse>, ApiError> {
    let service = state.service()?;

    if request.message.trim().is_empty() {
        return Err(ChatError::EmptyMessage.into());
    }

    let turn = service
        .handle_message(&request.message, request.session_id)?
        // handle_message only returns None for empty input, rejected above.
        .ok_or(ChatError::EmptyMessage)?;

    Ok(Json(ChatTurnResponse {
        session_id: turn.session_id,
        mode: turn.mode,
        content: turn.reply.content,
        blocks: turn.reply.blocks,
        log_len: turn.log_len,
    }))
}

/// GET /sessions/{id}/log - the full validated conversation log.
pub async fn get_log(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<LogResponse>, ApiError> {
    let service = state.service()?;
    let messages = service.render_log(session_id)?;
    Ok(Json(LogResponse {
        session_id,
        messages,
    }))
}

/// GET /sessions/{id}/mode - the session's current mode.
pub async fn get_mode(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ModeResponse>, ApiError> {
    let service = state.service()?;
    let mode = service.mode(session_id)?;
    Ok(Json(ModeResponse { session_id, mode }))
}

/// PUT /sessions/{id}/mode - switch the session's mode.
///
/// Takes effect on the next submitted message; never alters the log.
pub async fn put_mode(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ModeUpdateRequest>,
) -> Result<Json<ModeResponse>, ApiError> {
    let service = state.service()?;
    service.set_mode(session_id, request.mode)?;
    Ok(Json(ModeResponse {
        session_id,
        mode: request.mode,
    }))
}
