pub mod long_term;
pub mod preferences;
pub mod short_term;

pub use long_term::{dedup_against_existing, retrieve, ExtractionCandidate, HeuristicExtractor, MemoryExtractor, ScoredMemory};
pub use preferences::detect as detect_preferences;
pub use short_term::{window, BufferWindow};
