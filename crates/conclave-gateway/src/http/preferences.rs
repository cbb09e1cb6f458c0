use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use conclave_core::ConclaveError;
use conclave_store::{Preferences, StorePort};

use crate::app::AppState;
use crate::auth::resolve_external_user_id;
use crate::error::ApiError;

pub async fn get_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Json<Preferences>, ApiError> {
    let user_external_id = resolve_external_user_id(&state, &headers)?;
    let user = state.store.get_or_create_user(&user_external_id).map_err(|e| ConclaveError::Store(e.to_string()))?;
    let prefs = state.store.get_preferences(&user.id).map_err(|e| ConclaveError::Store(e.to_string()))?;
    Ok(Json(prefs))
}

pub async fn post_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(delta): Json<Preferences>,
) -> Result<Json<Preferences>, ApiError> {
    let user_external_id = resolve_external_user_id(&state, &headers)?;
    let user = state.store.get_or_create_user(&user_external_id).map_err(|e| ConclaveError::Store(e.to_string()))?;
    let merged = state.store.merge_preferences(&user.id, delta).map_err(|e| ConclaveError::Store(e.to_string()))?;
    Ok(Json(merged))
}

pub async fn delete_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<(), ApiError> {
    let user_external_id = resolve_external_user_id(&state, &headers)?;
    let user = state.store.get_or_create_user(&user_external_id).map_err(|e| ConclaveError::Store(e.to_string()))?;
    state.store.clear_preferences(&user.id).map_err(|e| ConclaveError::Store(e.to_string()))?;
    Ok(())
}
