use std::fmt;

use serde::{Deserialize, Serialize};

/// The two messaging platforms bridged by chatbridge.
///
/// Discord identifies a conversation by a numeric channel id, WhatsApp Web by
/// the chat's display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Discord,
    #[serde(alias = "whatsapp-web")]
    Whatsapp,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discord => "discord",
            Self::Whatsapp => "whatsapp",
        }
    }

    /// Short tag shown in front of relayed messages (`**[DS - Bob]:** hi`).
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Discord => "DS",
            Self::Whatsapp => "WA",
        }
    }

    /// The platform on the other side of the bridge.
    #[must_use]
    pub fn opposite(&self) -> Self {
        match self {
            Self::Discord => Self::Whatsapp,
            Self::Whatsapp => Self::Discord,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
