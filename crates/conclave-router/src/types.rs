use chrono::{DateTime, Utc};
use conclave_core::types::{ConversationId, Route};
use serde::{Deserialize, Serialize};

/// Per-conversation, cacheable routing state (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub conversation_id: ConversationId,
    pub age_verified: bool,
    pub age_verification_attempts: u32,
    pub current_route: Route,
    pub route_locked_until_message_index: u64,
    pub last_updated: DateTime<Utc>,
}

impl SessionState {
    pub fn new(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            age_verified: false,
            age_verification_attempts: 0,
            current_route: Route::Unset,
            route_locked_until_message_index: 0,
            last_updated: Utc::now(),
        }
    }

    pub fn is_locked_at(&self, message_index: u64) -> bool {
        message_index < self.route_locked_until_message_index
    }

    /// Conversations that have exhausted the age-verification attempt cap
    /// downgrade future explicit inputs to REFUSED for the remaining
    /// conversation lifetime (spec.md §4.2).
    pub fn attempts_exhausted(&self, cap: u32) -> bool {
        self.age_verification_attempts >= cap
    }
}

/// Action the orchestrator must take in response to a routing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteAction {
    Proceed,
    RequestAgeVerification,
    RefuseSoft,
    RefuseHard,
}

/// Output of the session router (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDecision {
    pub next_route: Route,
    pub action: RouteAction,
}
