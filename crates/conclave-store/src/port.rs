use conclave_core::types::{ConversationId, MemoryId, PersonaId, UserId};
use conclave_router::SessionState;

use crate::error::Result;
use crate::types::{Conversation, Memory, Message, Persona, Preferences, User};

/// Typed key/value + vector-search interface (spec.md §1: "the persistent
/// store, treated as a typed key/value + vector-search interface"). The
/// production implementation is `SqliteStore`; tests substitute fakes
/// (spec.md §9).
pub trait StorePort: Send + Sync {
    fn get_or_create_user(&self, external_id: &str) -> Result<User>;
    fn get_user(&self, id: &UserId) -> Result<Option<User>>;
    fn touch_user_last_active(&self, id: &UserId) -> Result<()>;
    /// Accumulate lifetime usage counters (spec.md §3 supplement).
    fn record_usage(&self, id: &UserId, messages_delta: u64, tokens_delta: u64) -> Result<()>;
    fn get_preferences(&self, id: &UserId) -> Result<Preferences>;
    fn merge_preferences(&self, id: &UserId, delta: Preferences) -> Result<Preferences>;
    fn clear_preferences(&self, id: &UserId) -> Result<()>;

    fn get_persona_by_name(&self, name: &str) -> Result<Option<Persona>>;
    fn get_persona_by_id(&self, id: &PersonaId) -> Result<Option<Persona>>;
    fn seed_persona(&self, persona: &Persona) -> Result<()>;

    fn create_conversation(&self, user_id: &UserId) -> Result<Conversation>;
    fn get_conversation(&self, id: &ConversationId) -> Result<Option<Conversation>>;
    fn list_conversations_for_user(&self, user_id: &UserId) -> Result<Vec<Conversation>>;
    /// Stamp the persona on first turn only (spec.md §3 invariant).
    fn stamp_conversation_persona(&self, id: &ConversationId, persona_id: &PersonaId) -> Result<()>;
    fn clear_conversation_summary(&self, id: &ConversationId) -> Result<()>;
    fn set_conversation_summary(&self, id: &ConversationId, summary: &str) -> Result<()>;

    fn append_message(&self, message: &Message) -> Result<()>;
    fn list_recent_messages(&self, conversation_id: &ConversationId, limit: usize) -> Result<Vec<Message>>;
    /// Total messages ever appended to this conversation — an uncapped
    /// `COUNT(*)`, unlike `list_recent_messages`'s bounded window. This is
    /// the monotonic counter the router's lock-in window indexes against.
    fn count_messages(&self, conversation_id: &ConversationId) -> Result<u64>;

    fn insert_memory(&self, memory: &Memory) -> Result<()>;
    fn list_memories_for_scope(&self, user_id: &UserId, persona_id: Option<&PersonaId>) -> Result<Vec<Memory>>;
    fn delete_memories_for_conversation(&self, user_id: &UserId, conversation_id: &ConversationId) -> Result<u64>;
    fn delete_memory(&self, id: &MemoryId) -> Result<()>;

    fn get_session_state(&self, conversation_id: &ConversationId) -> Result<Option<SessionState>>;
    fn save_session_state(&self, state: &SessionState) -> Result<()>;
}
