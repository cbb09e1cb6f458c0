use conclave_core::types::ConversationId;
use serde::Serialize;

/// Inbound request to the orchestrator (spec.md §4.8).
#[derive(Debug, Clone)]
pub struct ChatTurnInput {
    pub user_external_id: String,
    pub conversation_id: Option<ConversationId>,
    pub message: String,
    pub persona_name: Option<String>,
    pub custom_system_prompt: Option<String>,
}

/// Wire events emitted over `POST /chat` (spec.md §6), one JSON object per
/// line. Field names and the `type` tag match the external contract
/// exactly — the gateway serializes these directly, no translation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    Thinking {
        step: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
    },
    Token {
        content: String,
    },
    Done {
        conversation_id: String,
        message_id: String,
    },
    Error {
        kind: String,
        message: String,
    },
}
