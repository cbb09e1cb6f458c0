use conclave_store::Message;

/// Result of windowing a conversation's message history to the short-term
/// buffer's capacity (spec.md §4.3).
///
/// Thread-safety is the orchestrator's responsibility: operations on a
/// single conversation's buffer must be serialized by conversation id
/// (spec.md §5's per-conversation lease), not by this module.
pub struct BufferWindow {
    pub recent: Vec<Message>,
    pub evicted: Vec<Message>,
    pub summarize_needed: bool,
}

/// Trim `all` (chronological, oldest first) down to the last `capacity`
/// messages. Anything pushed out is returned as `evicted` — the caller
/// (orchestrator) folds it into the conversation's rolling summary via an
/// LLM-driven summarizer; this module only signals that the fold is due.
pub fn window(all: Vec<Message>, capacity: usize) -> BufferWindow {
    if all.len() <= capacity {
        return BufferWindow {
            recent: all,
            evicted: Vec::new(),
            summarize_needed: false,
        };
    }

    let split_at = all.len() - capacity;
    let mut all = all;
    let evicted = all.drain(..split_at).collect();
    BufferWindow {
        recent: all,
        evicted,
        summarize_needed: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_core::types::{ConversationId, Role};

    fn msgs(n: usize) -> Vec<Message> {
        let conv = ConversationId::new();
        (0..n)
            .map(|i| Message::new(conv.clone(), Role::User, format!("m{i}")))
            .collect()
    }

    #[test]
    fn under_capacity_does_not_evict() {
        let w = window(msgs(5), 20);
        assert_eq!(w.recent.len(), 5);
        assert!(w.evicted.is_empty());
        assert!(!w.summarize_needed);
    }

    #[test]
    fn over_capacity_evicts_oldest() {
        let w = window(msgs(25), 20);
        assert_eq!(w.recent.len(), 20);
        assert_eq!(w.evicted.len(), 5);
        assert!(w.summarize_needed);
        assert_eq!(w.evicted[0].content, "m0");
        assert_eq!(w.recent[0].content, "m5");
    }
}
