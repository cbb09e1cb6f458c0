use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ConclaveError, Result};
use crate::types::{ConversationId, Route, UserId};

/// Action recorded against a single classified message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Generate,
    Refuse,
    AgeVerify,
}

/// Append-only audit record. Exactly one is written per user message
/// (spec.md §8 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub user_id: UserId,
    pub conversation_id: ConversationId,
    pub label: String,
    pub confidence: f64,
    pub indicators: Vec<String>,
    pub route: Route,
    pub action: AuditAction,
    pub message_digest: String,
}

impl AuditEntry {
    pub fn digest(message: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(message.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Sink for audit entries. The real collaborator is external (spec.md §1);
/// this trait is the contract, `JsonlAuditSink` is the reference impl used
/// when no other sink is wired in.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry) -> Result<()>;
}

/// Appends one JSON object per line to a file, matching spec.md §6's
/// "Audit log format is JSON lines, one AuditEntry per line."
pub struct JsonlAuditSink {
    file: Mutex<std::fs::File>,
}

impl JsonlAuditSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for JsonlAuditSink {
    fn record(&self, entry: &AuditEntry) -> Result<()> {
        let line = serde_json::to_string(entry)?;
        let mut file = self
            .file
            .lock()
            .map_err(|_| ConclaveError::Internal("audit sink lock poisoned".to_string()))?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

/// In-memory sink for tests — never touches disk.
#[derive(Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, entry: &AuditEntry) -> Result<()> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(AuditEntry::digest("hello"), AuditEntry::digest("hello"));
        assert_ne!(AuditEntry::digest("hello"), AuditEntry::digest("world"));
    }

    #[test]
    fn memory_sink_records_entries_in_order() {
        let sink = MemoryAuditSink::new();
        let entry = AuditEntry {
            timestamp: Utc::now(),
            user_id: UserId::new(),
            conversation_id: ConversationId::new(),
            label: "SAFE".to_string(),
            confidence: 1.0,
            indicators: vec![],
            route: Route::Normal,
            action: AuditAction::Generate,
            message_digest: AuditEntry::digest("hi"),
        };
        sink.record(&entry).unwrap();
        assert_eq!(sink.entries().len(), 1);
    }

    #[test]
    fn jsonl_sink_appends_one_line_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = JsonlAuditSink::open(&path).unwrap();
        let entry = AuditEntry {
            timestamp: Utc::now(),
            user_id: UserId::new(),
            conversation_id: ConversationId::new(),
            label: "SAFE".to_string(),
            confidence: 1.0,
            indicators: vec![],
            route: Route::Normal,
            action: AuditAction::Generate,
            message_digest: AuditEntry::digest("hi"),
        };
        sink.record(&entry).unwrap();
        sink.record(&entry).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
