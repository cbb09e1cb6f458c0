use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use conclave_store::StorePort;
use serde_json::{json, Value};

use crate::app::AppState;

/// GET /health — liveness probe plus the ambient config snapshot's auth
/// mode (SPEC_FULL.md §6).
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let database_ok = state.store.get_user(&conclave_core::types::UserId::new()).is_ok();

    Json(json!({
        "status": "ok",
        "database": if database_ok { "ok" } else { "unreachable" },
        "llm": {
            "primary": state.config.providers.primary.name,
            "secondary": state.config.providers.secondary.name,
        },
        "auth_mode": state.config.gateway.auth_mode,
    }))
}
