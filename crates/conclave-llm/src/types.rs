use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single turn in the conversation history handed to a provider.
/// The system prompt travels separately on `ChatParams`, matching the
/// composer's output being a whole-prompt string rather than a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Per-call generation parameters (spec.md §4.7).
#[derive(Debug, Clone)]
pub struct ChatParams {
    pub model: String,
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stop_sequences: Vec<String>,
    pub timeout_ms: u64,
}

impl Default for ChatParams {
    fn default() -> Self {
        Self {
            model: String::new(),
            system_prompt: String::new(),
            temperature: 0.7,
            max_tokens: 1024,
            stop_sequences: Vec::new(),
            timeout_ms: 30_000,
        }
    }
}

/// Full, non-streaming provider response.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub stop_reason: String,
}

/// Events emitted while a provider streams a response.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Token { text: String },
    Done { tokens_in: u32, tokens_out: u32, stop_reason: String },
    Error { message: String },
}
