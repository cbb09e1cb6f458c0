use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use conclave_classifier::Classifier;
use conclave_core::config::ConclaveConfig;
use conclave_orchestrator::Orchestrator;
use conclave_store::StorePort;

/// Central shared state, passed as `Arc<AppState>` to every handler.
pub struct AppState {
    pub config: Arc<ConclaveConfig>,
    pub store: Arc<dyn StorePort>,
    pub orchestrator: Arc<Orchestrator>,
    /// Standalone classifier instance for the stateless `/content/classify`
    /// probe — the orchestrator's own classifier is private to a turn.
    pub classifier: Classifier,
}

impl AppState {
    pub fn new(config: Arc<ConclaveConfig>, store: Arc<dyn StorePort>, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            config,
            store,
            orchestrator,
            classifier: Classifier::new(),
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/chat", post(crate::http::chat::chat_handler))
        .route("/content/age-verify", post(crate::http::content::age_verify_handler))
        .route("/content/session/{conversation_id}", get(crate::http::content::session_handler))
        .route("/content/classify", post(crate::http::content::classify_handler))
        .route("/preferences", get(crate::http::preferences::get_handler))
        .route("/preferences", post(crate::http::preferences::post_handler))
        .route("/preferences", delete(crate::http::preferences::delete_handler))
        .route("/conversations", get(crate::http::conversations::list_handler))
        .route("/conversation/reset", post(crate::http::conversations::reset_handler))
        .route("/memory/clear", post(crate::http::conversations::memory_clear_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
