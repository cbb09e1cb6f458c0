pub mod db;
pub mod error;
pub mod port;
pub mod seed;
pub mod sqlite;
pub mod types;

pub use error::{Result, StoreError};
pub use port::StorePort;
pub use seed::default_personas;
pub use sqlite::SqliteStore;
pub use types::{Conversation, Memory, Message, Persona, Preferences, User};
