use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use conclave_core::types::ConversationId;
use conclave_core::ConclaveError;
use conclave_store::{Conversation, StorePort};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::resolve_external_user_id;
use crate::error::ApiError;

pub async fn list_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Json<Vec<Conversation>>, ApiError> {
    let user_external_id = resolve_external_user_id(&state, &headers)?;
    let user = state.store.get_or_create_user(&user_external_id).map_err(|e| ConclaveError::Store(e.to_string()))?;
    let conversations = state
        .store
        .list_conversations_for_user(&user.id)
        .map_err(|e| ConclaveError::Store(e.to_string()))?;
    Ok(Json(conversations))
}

#[derive(Deserialize)]
pub struct ConversationIdRequest {
    pub conversation_id: String,
}

#[derive(Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// Clears the short-term buffer. The buffer has no storage of its own —
/// it is recomputed each turn from recent messages — so the only
/// persisted state to clear is the folded long-history summary; messages
/// and memories are untouched (spec.md §6).
pub async fn reset_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ConversationIdRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let user_external_id = resolve_external_user_id(&state, &headers)?;
    let conversation_id = ConversationId::from(req.conversation_id.as_str());
    authorize(&state, &user_external_id, &conversation_id)?;

    state
        .store
        .clear_conversation_summary(&conversation_id)
        .map_err(|e| ConclaveError::Store(e.to_string()))?;
    Ok(Json(OkResponse { ok: true }))
}

pub async fn memory_clear_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ConversationIdRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let user_external_id = resolve_external_user_id(&state, &headers)?;
    let conversation_id = ConversationId::from(req.conversation_id.as_str());
    let user = authorize(&state, &user_external_id, &conversation_id)?;

    state
        .store
        .delete_memories_for_conversation(&user.id, &conversation_id)
        .map_err(|e| ConclaveError::Store(e.to_string()))?;
    Ok(Json(OkResponse { ok: true }))
}

fn authorize(state: &AppState, user_external_id: &str, conversation_id: &ConversationId) -> Result<conclave_store::User, ConclaveError> {
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
    Ok(user)
}
