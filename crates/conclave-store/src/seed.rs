use std::collections::HashMap;

use chrono::Utc;
use conclave_core::types::PersonaId;

use crate::types::Persona;

/// Personas seeded into a fresh deployment at startup (spec.md §3: Persona
/// lifecycle is "seeded at startup; rarely mutated; cached"). Names and
/// traits are illustrative defaults, not policy — operators add more via
/// the same `StorePort::seed_persona` call.
pub fn default_personas() -> Vec<Persona> {
    let now = Utc::now();
    vec![
        Persona {
            id: PersonaId::new(),
            name: "nova".to_string(),
            archetype: "companion".to_string(),
            traits: HashMap::from([
                ("humor".to_string(), 6),
                ("formality".to_string(), 3),
                ("enthusiasm".to_string(), 7),
                ("empathy".to_string(), 8),
            ]),
            base_system_text: "You are Nova.".to_string(),
            created_at: now,
            updated_at: now,
        },
        Persona {
            id: PersonaId::new(),
            name: "elara".to_string(),
            archetype: "mentor".to_string(),
            traits: HashMap::from([
                ("humor".to_string(), 3),
                ("formality".to_string(), 7),
                ("enthusiasm".to_string(), 5),
                ("empathy".to_string(), 6),
            ]),
            base_system_text: "You are Elara.".to_string(),
            created_at: now,
            updated_at: now,
        },
    ]
}
