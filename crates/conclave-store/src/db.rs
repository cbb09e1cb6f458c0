use rusqlite::Connection;

use crate::error::Result;

pub fn init_db(conn: &Connection) -> Result<()> {
    create_users_table(conn)?;
    create_personas_table(conn)?;
    create_conversations_table(conn)?;
    create_messages_table(conn)?;
    create_memories_table(conn)?;
    create_session_state_table(conn)?;
    Ok(())
}

fn create_users_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            external_id TEXT NOT NULL UNIQUE,
            display_name TEXT,
            metadata TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL,
            last_active_at TEXT NOT NULL,
            total_messages INTEGER NOT NULL DEFAULT 0,
            total_tokens_used INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_users_external_id ON users(external_id);",
    )?;
    Ok(())
}

fn create_personas_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS personas (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            archetype TEXT NOT NULL,
            traits TEXT NOT NULL DEFAULT '{}',
            base_system_text TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
    )?;
    Ok(())
}

fn create_conversations_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS conversations (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            persona_id TEXT,
            title TEXT,
            last_summary TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_conversations_user ON conversations(user_id);",
    )?;
    Ok(())
}

fn create_messages_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            conversation_id TEXT NOT NULL,
            role TEXT NOT NULL,
            content TEXT NOT NULL,
            timestamp TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, timestamp);",
    )?;
    Ok(())
}

fn create_memories_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS memories (
            id TEXT PRIMARY KEY,
            conversation_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            persona_id TEXT,
            content TEXT NOT NULL,
            embedding TEXT NOT NULL,
            kind TEXT NOT NULL,
            importance REAL NOT NULL,
            metadata TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_memories_user_persona ON memories(user_id, persona_id);
        CREATE INDEX IF NOT EXISTS idx_memories_conversation ON memories(conversation_id);",
    )?;
    Ok(())
}

fn create_session_state_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS session_state (
            conversation_id TEXT PRIMARY KEY,
            age_verified INTEGER NOT NULL DEFAULT 0,
            age_verification_attempts INTEGER NOT NULL DEFAULT 0,
            current_route TEXT NOT NULL,
            route_locked_until_message_index INTEGER NOT NULL DEFAULT 0,
            last_updated TEXT NOT NULL
        );",
    )?;
    Ok(())
}
