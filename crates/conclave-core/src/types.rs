use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Mint a fresh, time-sortable identifier.
            pub fn new() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(PersonaId);
id_newtype!(ConversationId);
id_newtype!(MessageId);
id_newtype!(MemoryId);

/// Role of a message in a conversation transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            _ => Err(()),
        }
    }
}

/// Kind of a long-term memory row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    Fact,
    Preference,
    Event,
    Context,
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MemoryKind::Fact => "fact",
            MemoryKind::Preference => "preference",
            MemoryKind::Event => "event",
            MemoryKind::Context => "context",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for MemoryKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fact" => Ok(MemoryKind::Fact),
            "preference" => Ok(MemoryKind::Preference),
            "event" => Ok(MemoryKind::Event),
            "context" => Ok(MemoryKind::Context),
            _ => Err(()),
        }
    }
}

/// The active content-policy regime for a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Route {
    Normal,
    Romance,
    Explicit,
    Fetish,
    Refused,
    HardRefused,
    GatePending,
    Unset,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Route::Normal => "NORMAL",
            Route::Romance => "ROMANCE",
            Route::Explicit => "EXPLICIT",
            Route::Fetish => "FETISH",
            Route::Refused => "REFUSED",
            Route::HardRefused => "HARD_REFUSED",
            Route::GatePending => "GATE_PENDING",
            Route::Unset => "UNSET",
        };
        write!(f, "{s}")
    }
}

impl Route {
    /// Explicit-family routes share the lock-in and fallback-provider treatment.
    pub fn is_explicit_family(&self) -> bool {
        matches!(self, Route::Explicit | Route::Fetish)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_newtype_roundtrips_through_string() {
        let id = UserId::new();
        let s = id.to_string();
        let back = UserId::from(s.clone());
        assert_eq!(back.as_str(), s);
    }

    #[test]
    fn route_display_matches_screaming_snake() {
        assert_eq!(Route::HardRefused.to_string(), "HARD_REFUSED");
        assert_eq!(Route::GatePending.to_string(), "GATE_PENDING");
    }

    #[test]
    fn explicit_family_covers_explicit_and_fetish_only() {
        assert!(Route::Explicit.is_explicit_family());
        assert!(Route::Fetish.is_explicit_family());
        assert!(!Route::Romance.is_explicit_family());
    }
}
