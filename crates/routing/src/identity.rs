use std::fmt;

use serde::{Deserialize, Serialize};

/// An address on one side of the bridge.
///
/// Discord channels are numeric snowflakes; WhatsApp Web chats are addressed
/// by their display name. The variant decides which route table a lookup
/// consults.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identity {
    Numeric(u64),
    Named(String),
}

impl Identity {
    /// Classify a raw string: all-digit input that fits in a `u64` becomes
    /// [`Identity::Numeric`], anything else [`Identity::Named`].
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if !trimmed.is_empty()
            && trimmed.bytes().all(|b| b.is_ascii_digit())
            && let Ok(id) = trimmed.parse::<u64>()
        {
            return Self::Numeric(id);
        }
        Self::Named(raw.to_string())
    }

    pub fn as_numeric(&self) -> Option<u64> {
        match self {
            Self::Numeric(id) => Some(*id),
            Self::Named(_) => None,
        }
    }

    pub fn as_named(&self) -> Option<&str> {
        match self {
            Self::Numeric(_) => None,
            Self::Named(name) => Some(name),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{id}"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

impl From<u64> for Identity {
    fn from(id: u64) -> Self {
        Self::Numeric(id)
    }
}

impl From<&str> for Identity {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for Identity {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}
