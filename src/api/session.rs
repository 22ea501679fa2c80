//! Dispatch session endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dispatch::{DispatchSession, SendOutcome, SessionStatus, SessionSummary};
use crate::error::{AppError, Result};
use crate::gateway::{GatewayClient, GatewayConfig, MessageSender};
use crate::recipient::Recipient;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub template: String,
    pub recipients: Vec<Recipient>,
    /// Falls back to the configured default gateway
    #[serde(default)]
    pub gateway: Option<GatewayConfig>,
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSummary>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct SessionResultsResponse {
    pub id: Uuid,
    pub status: SessionStatus,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub outcomes: Vec<SendOutcome>,
}

fn find_session(state: &AppState, id: Uuid) -> Result<Arc<DispatchSession>> {
    state
        .registry
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("Session {} not found", id)))
}

/// POST /api/v1/sessions - Create a session and start sending
#[tracing::instrument(
    name = "http.create_session",
    skip(state, request),
    fields(recipients = request.recipients.len())
)]
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionSummary>)> {
    let gateway = request
        .gateway
        .unwrap_or_else(|| state.settings.gateway.clone());
    let sender: Arc<dyn MessageSender> = Arc::new(GatewayClient::new(gateway)?);

    let session = state.registry.create();
    if let Err(e) = session.start(request.template, request.recipients, sender).await {
        // Never started, so removal cannot be refused
        let _ = state.registry.remove(&session.id());
        return Err(e.into());
    }

    Ok((StatusCode::CREATED, Json(SessionSummary::of(&session))))
}

/// GET /api/v1/sessions - List all sessions
pub async fn list_sessions(State(state): State<AppState>) -> Json<SessionListResponse> {
    let sessions = state.registry.list();
    let total = sessions.len();

    Json(SessionListResponse { sessions, total })
}

/// GET /api/v1/sessions/{id} - Current progress of one session
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>> {
    let session = find_session(&state, id)?;
    Ok(Json(SessionSummary::of(&session)))
}

/// GET /api/v1/sessions/{id}/results - Outcomes recorded so far
pub async fn session_results(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResultsResponse>> {
    let session = find_session(&state, id)?;
    let outcomes = session.outcomes().await;
    let progress = session.progress();
    let succeeded = outcomes.iter().filter(|o| o.success).count();

    Ok(Json(SessionResultsResponse {
        id,
        status: progress.status,
        total: progress.total,
        succeeded,
        failed: outcomes.len() - succeeded,
        outcomes,
    }))
}

/// POST /api/v1/sessions/{id}/pause
#[tracing::instrument(name = "http.pause_session", skip(state))]
pub async fn pause_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>> {
    let session = find_session(&state, id)?;
    session.pause()?;
    Ok(Json(SessionSummary::of(&session)))
}

/// POST /api/v1/sessions/{id}/resume
#[tracing::instrument(name = "http.resume_session", skip(state))]
pub async fn resume_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>> {
    let session = find_session(&state, id)?;
    session.resume()?;
    Ok(Json(SessionSummary::of(&session)))
}

/// POST /api/v1/sessions/{id}/cancel
#[tracing::instrument(name = "http.cancel_session", skip(state))]
pub async fn cancel_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>> {
    let session = find_session(&state, id)?;
    session.cancel()?;
    Ok(Json(SessionSummary::of(&session)))
}

/// POST /api/v1/sessions/{id}/reset
#[tracing::instrument(name = "http.reset_session", skip(state))]
pub async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>> {
    let session = find_session(&state, id)?;
    session.reset().await?;
    Ok(Json(SessionSummary::of(&session)))
}

/// DELETE /api/v1/sessions/{id} - Forget a session that is not running
#[tracing::instrument(name = "http.delete_session", skip(state))]
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    match state.registry.remove(&id)? {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(AppError::NotFound(format!("Session {} not found", id))),
    }
}
