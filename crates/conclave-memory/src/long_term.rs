use conclave_core::embedding::cosine_similarity;
use conclave_core::types::{ConversationId, MemoryKind, PersonaId, UserId};
use conclave_store::{Memory, StorePort};

/// A retrieved memory together with the score that ranked it.
#[derive(Debug, Clone)]
pub struct ScoredMemory {
    pub memory: Memory,
    pub similarity: f64,
    pub score: f64,
}

/// Retrieve at most `k` memories scoped exactly to `(user_id, persona_id)`,
/// ranked by `score = similarity_weight * cosine_similarity + importance_weight
/// * importance`, filtered to `cosine_similarity >= threshold` (spec.md
/// §4.4). Ties break by recency (newer first).
pub fn retrieve(
    store: &dyn StorePort,
    user_id: &UserId,
    persona_id: Option<&PersonaId>,
    query_embedding: &[f32],
    k: usize,
    similarity_weight: f64,
    importance_weight: f64,
    similarity_threshold: f64,
) -> conclave_store::Result<Vec<ScoredMemory>> {
    let candidates = store.list_memories_for_scope(user_id, persona_id)?;

    let mut scored: Vec<ScoredMemory> = candidates
        .into_iter()
        .filter_map(|memory| {
            let similarity = cosine_similarity(query_embedding, &memory.embedding);
            if similarity < similarity_threshold {
                return None;
            }
            let score = similarity_weight * similarity + importance_weight * memory.importance;
            Some(ScoredMemory {
                memory,
                similarity,
                score,
            })
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.memory.created_at.cmp(&a.memory.created_at))
    });

    scored.truncate(k);
    Ok(scored)
}

/// A candidate memory proposed by extraction, not yet deduplicated or
/// persisted.
#[derive(Debug, Clone)]
pub struct ExtractionCandidate {
    pub kind: MemoryKind,
    pub content: String,
    pub importance: f64,
}

/// Pass over a closed (user_message, assistant_message) turn and propose
/// zero or more candidate memories (spec.md §4.4). Pattern-based rather
/// than model-driven: the dispatcher-backed extraction pass, if wired by
/// the orchestrator, is a separate, richer `MemoryExtractor` the caller
/// may substitute.
pub trait MemoryExtractor: Send + Sync {
    fn extract(&self, user_message: &str, assistant_message: &str) -> Vec<ExtractionCandidate>;
}

/// Heuristic extractor recognizing a handful of first-person declarative
/// patterns. Deliberately conservative — it is the default, not the only
/// extractor; callers may substitute a model-backed one.
pub struct HeuristicExtractor;

impl MemoryExtractor for HeuristicExtractor {
    fn extract(&self, user_message: &str, _assistant_message: &str) -> Vec<ExtractionCandidate> {
        let lower = user_message.to_lowercase();
        let mut out = Vec::new();

        if let Some(name) = extract_after(&lower, user_message, "my name is ") {
            out.push(ExtractionCandidate {
                kind: MemoryKind::Fact,
                content: format!("The user's name is {name}."),
                importance: 0.8,
            });
        }

        if let Some(rest) = extract_after(&lower, user_message, "i live in ") {
            out.push(ExtractionCandidate {
                kind: MemoryKind::Fact,
                content: format!("The user lives in {rest}."),
                importance: 0.6,
            });
        }

        if let Some(rest) = extract_after(&lower, user_message, "i work as ") {
            out.push(ExtractionCandidate {
                kind: MemoryKind::Fact,
                content: format!("The user works as {rest}."),
                importance: 0.6,
            });
        }

        if let Some(rest) = extract_after(&lower, user_message, "i like ") {
            out.push(ExtractionCandidate {
                kind: MemoryKind::Preference,
                content: format!("The user likes {rest}."),
                importance: 0.5,
            });
        }

        if let Some(rest) = extract_after(&lower, user_message, "i hate ") {
            out.push(ExtractionCandidate {
                kind: MemoryKind::Preference,
                content: format!("The user dislikes {rest}."),
                importance: 0.5,
            });
        }

        out
    }
}

/// Return the remainder of `original` (preserving case) that follows
/// `marker` in the lowercased `lower`, trimmed of trailing punctuation.
fn extract_after(lower: &str, original: &str, marker: &str) -> Option<String> {
    let idx = lower.find(marker)?;
    let start = idx + marker.len();
    let rest = &original[start..];
    let trimmed = rest.trim_end_matches(['.', '!', '?', ' ']);
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Drop candidates whose embedding has cosine similarity >= `threshold`
/// with any existing memory of the same kind for the same scope (spec.md
/// §4.4 dedup rule).
pub fn dedup_against_existing<'a>(
    candidate_embedding: &[f32],
    candidate_kind: MemoryKind,
    existing: &'a [Memory],
    threshold: f64,
) -> bool {
    existing
        .iter()
        .filter(|m| m.kind == candidate_kind)
        .any(|m| cosine_similarity(candidate_embedding, &m.embedding) >= threshold)
}

/// Build a persistable Memory row from a surviving candidate.
pub fn to_memory(
    candidate: ExtractionCandidate,
    embedding: Vec<f32>,
    conversation_id: ConversationId,
    user_id: UserId,
    persona_id: Option<PersonaId>,
) -> Memory {
    Memory {
        id: conclave_core::types::MemoryId::new(),
        conversation_id,
        user_id,
        persona_id,
        content: candidate.content,
        embedding,
        kind: candidate.kind,
        importance: candidate.importance,
        metadata: serde_json::json!({}),
        created_at: chrono::Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_extractor_recognizes_name() {
        let ex = HeuristicExtractor;
        let out = ex.extract("Hi, my name is Kaloyan.", "Nice to meet you.");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].content, "The user's name is Kaloyan.");
        assert_eq!(out[0].kind, MemoryKind::Fact);
    }

    #[test]
    fn heuristic_extractor_yields_nothing_for_unmatched_text() {
        let ex = HeuristicExtractor;
        let out = ex.extract("What's the weather like?", "It's sunny.");
        assert!(out.is_empty());
    }

    #[test]
    fn dedup_drops_near_identical_embedding_same_kind() {
        let existing = vec![Memory {
            id: conclave_core::types::MemoryId::new(),
            conversation_id: ConversationId::new(),
            user_id: UserId::new(),
            persona_id: None,
            content: "The user's name is Kaloyan.".to_string(),
            embedding: vec![1.0, 0.0],
            kind: MemoryKind::Fact,
            importance: 0.8,
            metadata: serde_json::json!({}),
            created_at: chrono::Utc::now(),
        }];
        assert!(dedup_against_existing(&[0.999, 0.001], MemoryKind::Fact, &existing, 0.92));
        assert!(!dedup_against_existing(&[0.0, 1.0], MemoryKind::Fact, &existing, 0.92));
        assert!(!dedup_against_existing(&[1.0, 0.0], MemoryKind::Preference, &existing, 0.92));
    }
}
