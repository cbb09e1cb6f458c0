pub mod extraction;
pub mod lease;
pub mod orchestrator;
pub mod refusal;
pub mod types;

pub use lease::LeaseRegistry;
pub use orchestrator::Orchestrator;
pub use types::{ChatEvent, ChatTurnInput};
