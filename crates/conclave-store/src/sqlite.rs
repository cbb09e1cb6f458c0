use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use conclave_core::types::{
    ConversationId, MemoryId, MemoryKind, MessageId, PersonaId, Role, UserId,
};
use conclave_core::types::Route;
use conclave_router::SessionState;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::instrument;

use crate::db::init_db;
use crate::error::{Result, StoreError};
use crate::port::StorePort;
use crate::types::{Conversation, Memory, Message, Persona, Preferences, User};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    let metadata_raw: String = row.get("metadata")?;
    Ok(User {
        id: UserId::from(row.get::<_, String>("id")?),
        external_id: row.get("external_id")?,
        display_name: row.get("display_name")?,
        metadata: serde_json::from_str(&metadata_raw).unwrap_or_else(|_| serde_json::json!({})),
        created_at: parse_ts(row.get::<_, String>("created_at")?),
        last_active_at: parse_ts(row.get::<_, String>("last_active_at")?),
        total_messages: row.get::<_, i64>("total_messages")? as u64,
        total_tokens_used: row.get::<_, i64>("total_tokens_used")? as u64,
    })
}

fn row_to_persona(row: &Row) -> rusqlite::Result<Persona> {
    let traits_raw: String = row.get("traits")?;
    Ok(Persona {
        id: PersonaId::from(row.get::<_, String>("id")?),
        name: row.get("name")?,
        archetype: row.get("archetype")?,
        traits: serde_json::from_str(&traits_raw).unwrap_or_default(),
        base_system_text: row.get("base_system_text")?,
        created_at: parse_ts(row.get::<_, String>("created_at")?),
        updated_at: parse_ts(row.get::<_, String>("updated_at")?),
    })
}

fn row_to_conversation(row: &Row) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: ConversationId::from(row.get::<_, String>("id")?),
        user_id: UserId::from(row.get::<_, String>("user_id")?),
        persona_id: row
            .get::<_, Option<String>>("persona_id")?
            .map(PersonaId::from),
        title: row.get("title")?,
        last_summary: row.get("last_summary")?,
        created_at: parse_ts(row.get::<_, String>("created_at")?),
        updated_at: parse_ts(row.get::<_, String>("updated_at")?),
    })
}

fn row_to_message(row: &Row) -> rusqlite::Result<Message> {
    let role_raw: String = row.get("role")?;
    Ok(Message {
        id: MessageId::from(row.get::<_, String>("id")?),
        conversation_id: ConversationId::from(row.get::<_, String>("conversation_id")?),
        role: Role::from_str(&role_raw).unwrap_or(Role::User),
        content: row.get("content")?,
        timestamp: parse_ts(row.get::<_, String>("timestamp")?),
    })
}

fn row_to_memory(row: &Row) -> rusqlite::Result<Memory> {
    let embedding_raw: String = row.get("embedding")?;
    let kind_raw: String = row.get("kind")?;
    let metadata_raw: String = row.get("metadata")?;
    Ok(Memory {
        id: MemoryId::from(row.get::<_, String>("id")?),
        conversation_id: ConversationId::from(row.get::<_, String>("conversation_id")?),
        user_id: UserId::from(row.get::<_, String>("user_id")?),
        persona_id: row
            .get::<_, Option<String>>("persona_id")?
            .map(PersonaId::from),
        content: row.get("content")?,
        embedding: serde_json::from_str(&embedding_raw).unwrap_or_default(),
        kind: MemoryKind::from_str(&kind_raw).unwrap_or(MemoryKind::Context),
        importance: row.get("importance")?,
        metadata: serde_json::from_str(&metadata_raw).unwrap_or_else(|_| serde_json::json!({})),
        created_at: parse_ts(row.get::<_, String>("created_at")?),
    })
}

fn row_to_session_state(row: &Row) -> rusqlite::Result<SessionState> {
    let route_raw: String = row.get("current_route")?;
    Ok(SessionState {
        conversation_id: ConversationId::from(row.get::<_, String>("conversation_id")?),
        age_verified: row.get::<_, i64>("age_verified")? != 0,
        age_verification_attempts: row.get::<_, i64>("age_verification_attempts")? as u32,
        current_route: parse_route(&route_raw),
        route_locked_until_message_index: row.get::<_, i64>("route_locked_until_message_index")? as u64,
        last_updated: parse_ts(row.get::<_, String>("last_updated")?),
    })
}

fn parse_route(s: &str) -> Route {
    match s {
        "NORMAL" => Route::Normal,
        "ROMANCE" => Route::Romance,
        "EXPLICIT" => Route::Explicit,
        "FETISH" => Route::Fetish,
        "REFUSED" => Route::Refused,
        "HARD_REFUSED" => Route::HardRefused,
        "GATE_PENDING" => Route::GatePending,
        _ => Route::Unset,
    }
}

fn parse_ts(raw: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn preferences_from_metadata(metadata: &serde_json::Value) -> Preferences {
    metadata
        .get("communication_preferences")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

impl StorePort for SqliteStore {
    #[instrument(skip(self))]
    fn get_or_create_user(&self, external_id: &str) -> Result<User> {
        let conn = self.conn.lock().unwrap();

        if let Some(user) = conn
            .query_row(
                "SELECT * FROM users WHERE external_id = ?1",
                params![external_id],
                row_to_user,
            )
            .optional()?
        {
            return Ok(user);
        }

        let user = User::new(external_id);
        conn.execute(
            "INSERT OR IGNORE INTO users (id, external_id, display_name, metadata, created_at, last_active_at, total_messages, total_tokens_used)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 0)",
            params![
                user.id.as_str(),
                user.external_id,
                user.display_name,
                user.metadata.to_string(),
                user.created_at.to_rfc3339(),
                user.last_active_at.to_rfc3339(),
            ],
        )?;

        // Re-read to survive a race with a concurrent creator of the same identity.
        conn.query_row(
            "SELECT * FROM users WHERE external_id = ?1",
            params![external_id],
            row_to_user,
        )
        .map_err(StoreError::from)
    }

    fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM users WHERE id = ?1",
            params![id.as_str()],
            row_to_user,
        )
        .optional()
        .map_err(StoreError::from)
    }

    fn touch_user_last_active(&self, id: &UserId) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE users SET last_active_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), id.as_str()],
        )?;
        Ok(())
    }

    fn record_usage(&self, id: &UserId, messages_delta: u64, tokens_delta: u64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE users SET total_messages = total_messages + ?1, total_tokens_used = total_tokens_used + ?2 WHERE id = ?3",
            params![messages_delta as i64, tokens_delta as i64, id.as_str()],
        )?;
        Ok(())
    }

    fn get_preferences(&self, id: &UserId) -> Result<Preferences> {
        let user = self
            .get_user(id)?
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
        Ok(preferences_from_metadata(&user.metadata))
    }

    fn merge_preferences(&self, id: &UserId, delta: Preferences) -> Result<Preferences> {
        let conn = self.conn.lock().unwrap();
        let metadata_raw: String = conn.query_row(
            "SELECT metadata FROM users WHERE id = ?1",
            params![id.as_str()],
            |row| row.get(0),
        )?;
        let mut metadata: serde_json::Value =
            serde_json::from_str(&metadata_raw).unwrap_or_else(|_| serde_json::json!({}));
        let mut prefs = preferences_from_metadata(&metadata);
        prefs.merge(delta);
        metadata["communication_preferences"] = serde_json::to_value(&prefs)?;
        conn.execute(
            "UPDATE users SET metadata = ?1 WHERE id = ?2",
            params![metadata.to_string(), id.as_str()],
        )?;
        Ok(prefs)
    }

    fn clear_preferences(&self, id: &UserId) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let metadata_raw: String = conn.query_row(
            "SELECT metadata FROM users WHERE id = ?1",
            params![id.as_str()],
            |row| row.get(0),
        )?;
        let mut metadata: serde_json::Value =
            serde_json::from_str(&metadata_raw).unwrap_or_else(|_| serde_json::json!({}));
        metadata["communication_preferences"] = serde_json::json!(null);
        conn.execute(
            "UPDATE users SET metadata = ?1 WHERE id = ?2",
            params![metadata.to_string(), id.as_str()],
        )?;
        Ok(())
    }

    fn get_persona_by_name(&self, name: &str) -> Result<Option<Persona>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT * FROM personas WHERE name = ?1", params![name], row_to_persona)
            .optional()
            .map_err(StoreError::from)
    }

    fn get_persona_by_id(&self, id: &PersonaId) -> Result<Option<Persona>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT * FROM personas WHERE id = ?1", params![id.as_str()], row_to_persona)
            .optional()
            .map_err(StoreError::from)
    }

    fn seed_persona(&self, persona: &Persona) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO personas (id, name, archetype, traits, base_system_text, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                persona.id.as_str(),
                persona.name,
                persona.archetype,
                serde_json::to_string(&persona.traits)?,
                persona.base_system_text,
                persona.created_at.to_rfc3339(),
                persona.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn create_conversation(&self, user_id: &UserId) -> Result<Conversation> {
        let conn = self.conn.lock().unwrap();
        let conv = Conversation::new(user_id.clone());
        conn.execute(
            "INSERT INTO conversations (id, user_id, persona_id, title, last_summary, created_at, updated_at)
             VALUES (?1, ?2, NULL, NULL, NULL, ?3, ?4)",
            params![
                conv.id.as_str(),
                conv.user_id.as_str(),
                conv.created_at.to_rfc3339(),
                conv.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(conv)
    }

    fn get_conversation(&self, id: &ConversationId) -> Result<Option<Conversation>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM conversations WHERE id = ?1",
            params![id.as_str()],
            row_to_conversation,
        )
        .optional()
        .map_err(StoreError::from)
    }

    fn list_conversations_for_user(&self, user_id: &UserId) -> Result<Vec<Conversation>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM conversations WHERE user_id = ?1 ORDER BY updated_at DESC",
        )?;
        let rows = stmt
            .query_map(params![user_id.as_str()], row_to_conversation)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn stamp_conversation_persona(&self, id: &ConversationId, persona_id: &PersonaId) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE conversations SET persona_id = ?1, updated_at = ?2
             WHERE id = ?3 AND persona_id IS NULL",
            params![persona_id.as_str(), Utc::now().to_rfc3339(), id.as_str()],
        )?;
        Ok(())
    }

    fn clear_conversation_summary(&self, id: &ConversationId) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE conversations SET last_summary = NULL, updated_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), id.as_str()],
        )?;
        Ok(())
    }

    fn set_conversation_summary(&self, id: &ConversationId, summary: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE conversations SET last_summary = ?1, updated_at = ?2 WHERE id = ?3",
            params![summary, Utc::now().to_rfc3339(), id.as_str()],
        )?;
        Ok(())
    }

    fn append_message(&self, message: &Message) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO messages (id, conversation_id, role, content, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.id.as_str(),
                message.conversation_id.as_str(),
                message.role.to_string(),
                message.content,
                message.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn list_recent_messages(&self, conversation_id: &ConversationId, limit: usize) -> Result<Vec<Message>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM messages WHERE conversation_id = ?1 ORDER BY timestamp DESC LIMIT ?2",
        )?;
        let mut rows = stmt
            .query_map(params![conversation_id.as_str(), limit as i64], row_to_message)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.reverse();
        Ok(rows)
    }

    fn count_messages(&self, conversation_id: &ConversationId) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
            params![conversation_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn insert_memory(&self, memory: &Memory) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO memories (id, conversation_id, user_id, persona_id, content, embedding, kind, importance, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                memory.id.as_str(),
                memory.conversation_id.as_str(),
                memory.user_id.as_str(),
                memory.persona_id.as_ref().map(|p| p.as_str()),
                memory.content,
                serde_json::to_string(&memory.embedding)?,
                memory.kind.to_string(),
                memory.importance,
                memory.metadata.to_string(),
                memory.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn list_memories_for_scope(&self, user_id: &UserId, persona_id: Option<&PersonaId>) -> Result<Vec<Memory>> {
        let conn = self.conn.lock().unwrap();
        let rows = match persona_id {
            Some(pid) => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM memories WHERE user_id = ?1 AND persona_id = ?2",
                )?;
                stmt.query_map(params![user_id.as_str(), pid.as_str()], row_to_memory)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM memories WHERE user_id = ?1 AND persona_id IS NULL",
                )?;
                stmt.query_map(params![user_id.as_str()], row_to_memory)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(rows)
    }

    fn delete_memories_for_conversation(&self, user_id: &UserId, conversation_id: &ConversationId) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "DELETE FROM memories WHERE user_id = ?1 AND conversation_id = ?2",
            params![user_id.as_str(), conversation_id.as_str()],
        )?;
        Ok(n as u64)
    }

    fn delete_memory(&self, id: &MemoryId) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM memories WHERE id = ?1", params![id.as_str()])?;
        Ok(())
    }

    fn get_session_state(&self, conversation_id: &ConversationId) -> Result<Option<SessionState>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM session_state WHERE conversation_id = ?1",
            params![conversation_id.as_str()],
            row_to_session_state,
        )
        .optional()
        .map_err(StoreError::from)
    }

    fn save_session_state(&self, state: &SessionState) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO session_state (conversation_id, age_verified, age_verification_attempts, current_route, route_locked_until_message_index, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(conversation_id) DO UPDATE SET
                age_verified = excluded.age_verified,
                age_verification_attempts = excluded.age_verification_attempts,
                current_route = excluded.current_route,
                route_locked_until_message_index = excluded.route_locked_until_message_index,
                last_updated = excluded.last_updated",
            params![
                state.conversation_id.as_str(),
                state.age_verified as i64,
                state.age_verification_attempts,
                state.current_route.to_string(),
                state.route_locked_until_message_index as i64,
                state.last_updated.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_core::types::MemoryKind;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    #[test]
    fn get_or_create_user_is_idempotent() {
        let s = store();
        let a = s.get_or_create_user("alice").unwrap();
        let b = s.get_or_create_user("alice").unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn conversation_persona_stamps_only_once() {
        let s = store();
        let user = s.get_or_create_user("bob").unwrap();
        let conv = s.create_conversation(&user.id).unwrap();
        let p1 = PersonaId::new();
        let p2 = PersonaId::new();
        s.stamp_conversation_persona(&conv.id, &p1).unwrap();
        s.stamp_conversation_persona(&conv.id, &p2).unwrap();
        let reloaded = s.get_conversation(&conv.id).unwrap().unwrap();
        assert_eq!(reloaded.persona_id, Some(p1));
    }

    #[test]
    fn preferences_merge_is_last_writer_wins() {
        let s = store();
        let user = s.get_or_create_user("carol").unwrap();
        s.merge_preferences(
            &user.id,
            Preferences {
                tone: Some("calm".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        let merged = s
            .merge_preferences(
                &user.id,
                Preferences {
                    tone: Some("enthusiastic".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(merged.tone, Some("enthusiastic".to_string()));
        assert!(merged.last_updated.is_some());
    }

    #[test]
    fn memories_scoped_by_user_and_persona() {
        let s = store();
        let user = s.get_or_create_user("dave").unwrap();
        let other_user = s.get_or_create_user("eve").unwrap();
        let persona = PersonaId::new();
        let conv = s.create_conversation(&user.id).unwrap();

        let mem = Memory {
            id: MemoryId::new(),
            conversation_id: conv.id.clone(),
            user_id: user.id.clone(),
            persona_id: Some(persona.clone()),
            content: "likes rust".to_string(),
            embedding: vec![0.1, 0.2],
            kind: MemoryKind::Preference,
            importance: 0.5,
            metadata: serde_json::json!({}),
            created_at: Utc::now(),
        };
        s.insert_memory(&mem).unwrap();

        let found = s.list_memories_for_scope(&user.id, Some(&persona)).unwrap();
        assert_eq!(found.len(), 1);
        let not_found = s.list_memories_for_scope(&other_user.id, Some(&persona)).unwrap();
        assert!(not_found.is_empty());
    }

    #[test]
    fn recent_messages_are_chronological() {
        let s = store();
        let user = s.get_or_create_user("frank").unwrap();
        let conv = s.create_conversation(&user.id).unwrap();
        for i in 0..3 {
            let msg = Message::new(conv.id.clone(), Role::User, format!("msg {i}"));
            s.append_message(&msg).unwrap();
        }
        let recent = s.list_recent_messages(&conv.id, 10).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].content, "msg 0");
        assert_eq!(recent[2].content, "msg 2");
    }
}
