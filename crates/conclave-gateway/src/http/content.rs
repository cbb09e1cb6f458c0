use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use conclave_core::types::ConversationId;
use conclave_core::ConclaveError;
use conclave_router::SessionState;
use conclave_store::StorePort;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::resolve_external_user_id;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct AgeVerifyRequest {
    pub conversation_id: String,
    pub confirmed: bool,
}

#[derive(Serialize)]
pub struct AgeVerifyResponse {
    pub age_verified: bool,
}

pub async fn age_verify_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AgeVerifyRequest>,
) -> Result<Json<AgeVerifyResponse>, ApiError> {
    let user_external_id = resolve_external_user_id(&state, &headers)?;
    let conversation_id = ConversationId::from(req.conversation_id.as_str());
    authorize_conversation(&state, &user_external_id, &conversation_id)?;

    let age_verified = state
        .orchestrator
        .confirm_age_verification(&conversation_id, req.confirmed)
        .await?;
    Ok(Json(AgeVerifyResponse { age_verified }))
}

pub async fn session_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
) -> Result<Json<SessionState>, ApiError> {
    let user_external_id = resolve_external_user_id(&state, &headers)?;
    let conversation_id = ConversationId::from(conversation_id.as_str());
    authorize_conversation(&state, &user_external_id, &conversation_id)?;

    let session = state
        .store
        .get_session_state(&conversation_id)
        .map_err(|e| ConclaveError::Store(e.to_string()))?
        .unwrap_or_else(|| SessionState::new(conversation_id));
    Ok(Json(session))
}

#[derive(Deserialize)]
pub struct ClassifyRequest {
    pub message: String,
}

#[derive(Serialize)]
pub struct ClassifyResponse {
    pub label: String,
    pub confidence: f64,
    pub indicators: Vec<String>,
    pub route: String,
}

/// Stateless probe: classifies `message` and reports the route it would
/// produce against a fresh (never-locked, unverified) session, without
/// touching persisted SessionState.
pub async fn classify_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ClassifyRequest>,
) -> Result<Json<ClassifyResponse>, ApiError> {
    resolve_external_user_id(&state, &headers)?;

    let output = state.classifier.classify(&req.message);
    let mut scratch = SessionState::new(ConversationId::new());
    let decision = conclave_router::route(&mut scratch, output.label, 0, &state.config.router);

    Ok(Json(ClassifyResponse {
        label: output.label.to_string(),
        confidence: output.confidence,
        indicators: output.indicators,
        route: decision.next_route.to_string(),
    }))
}

/// Cross-tenant access is always fatal (spec.md §8 universal invariant).
fn authorize_conversation(state: &AppState, user_external_id: &str, conversation_id: &ConversationId) -> Result<(), ConclaveError> {
    let user = state
        .store
        .get_or_create_user(user_external_id)
        .map_err(|e| ConclaveError::Store(e.to_string()))?;
    let conversation = state
        .store
        .get_conversation(conversation_id)
        .map_err(|e| ConclaveError::Store(e.to_string()))?
        .ok_or_else(|| ConclaveError::InvalidRequest { reason: "unknown conversation_id".to_string() })?;
    if conversation.user_id != user.id {
        return Err(ConclaveError::Forbidden { reason: "conversation belongs to another user".to_string() });
    }
    Ok(())
}
