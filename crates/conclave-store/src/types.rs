use std::collections::HashMap;

use chrono::{DateTime, Utc};
use conclave_core::types::{ConversationId, MemoryId, MemoryKind, MessageId, PersonaId, Role, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub external_id: String,
    pub display_name: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub total_messages: u64,
    pub total_tokens_used: u64,
}

impl User {
    pub fn new(external_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            external_id: external_id.into(),
            display_name: None,
            metadata: serde_json::json!({}),
            created_at: now,
            last_active_at: now,
            total_messages: 0,
            total_tokens_used: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub id: PersonaId,
    pub name: String,
    pub archetype: String,
    pub traits: HashMap<String, i32>,
    pub base_system_text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub user_id: UserId,
    pub persona_id: Option<PersonaId>,
    pub title: Option<String>,
    pub last_summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            user_id,
            persona_id: None,
            title: None,
            last_summary: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(conversation_id: ConversationId, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub id: MemoryId,
    pub conversation_id: ConversationId,
    pub user_id: UserId,
    pub persona_id: Option<PersonaId>,
    pub content: String,
    pub embedding: Vec<f32>,
    pub kind: MemoryKind,
    pub importance: f64,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Preferences record merged by the Preference Extractor (spec.md §4.5).
/// Stored as part of `User::metadata` under the `communication_preferences`
/// key; modeled here as its own struct for typed merge/read access.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Preferences {
    pub language: Option<String>,
    pub formality: Option<String>,
    pub tone: Option<String>,
    pub emoji_usage: Option<bool>,
    pub response_length: Option<String>,
    pub explanation_style: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Preferences {
    /// Merge `other` into `self`, last-writer-wins per field, and advance
    /// `last_updated` whenever at least one field changed.
    pub fn merge(&mut self, other: Preferences) {
        let mut changed = false;
        macro_rules! merge_field {
            ($field:ident) => {
                if other.$field.is_some() {
                    self.$field = other.$field;
                    changed = true;
                }
            };
        }
        merge_field!(language);
        merge_field!(formality);
        merge_field!(tone);
        merge_field!(emoji_usage);
        merge_field!(response_length);
        merge_field!(explanation_style);
        if changed {
            self.last_updated = Some(Utc::now());
        }
    }
}
