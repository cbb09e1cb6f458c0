use std::sync::Arc;

use conclave_core::types::ConversationId;
use dashmap::DashMap;
use tokio::sync::Mutex;

/// Per-conversation logical lease (spec.md §5). Not a global lock: each
/// conversation id gets its own mutex, so unrelated conversations never
/// contend with each other. Holding the guard serializes buffer and
/// session-state mutations for one conversation across concurrent
/// requests and the extraction worker pool.
#[derive(Default)]
pub struct LeaseRegistry {
    leases: DashMap<ConversationId, Arc<Mutex<()>>>,
}

impl LeaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, conversation_id: &ConversationId) -> Arc<Mutex<()>> {
        self.leases
            .entry(conversation_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_conversation_id_returns_the_same_lease() {
        let registry = LeaseRegistry::new();
        let id = ConversationId::new();
        let a = registry.get(&id);
        let b = registry.get(&id);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn distinct_conversation_ids_get_distinct_leases() {
        let registry = LeaseRegistry::new();
        let a = registry.get(&ConversationId::new());
        let b = registry.get(&ConversationId::new());
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
