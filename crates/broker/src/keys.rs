//! Names in the broker keyspace.

/// The two reverse-indexed route tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapTable {
    /// Discord channel id → WhatsApp chat name.
    DiscordToWhatsapp,
    /// WhatsApp chat name → Discord channel id.
    WhatsappToDiscord,
}

impl MapTable {
    pub fn key(&self) -> &'static str {
        match self {
            Self::DiscordToWhatsapp => "bridge:map:ds_to_wa",
            Self::WhatsappToDiscord => "bridge:map:wa_to_ds",
        }
    }

    #[must_use]
    pub fn reverse(&self) -> Self {
        match self {
            Self::DiscordToWhatsapp => Self::WhatsappToDiscord,
            Self::WhatsappToDiscord => Self::DiscordToWhatsapp,
        }
    }
}

/// The two relay queues, one per direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Queue {
    /// Filled by the Discord adapter, drained by the WhatsApp adapter.
    DiscordToWhatsapp,
    /// Filled by the WhatsApp adapter, drained by the Discord adapter.
    WhatsappToDiscord,
}

impl Queue {
    pub fn key(&self) -> &'static str {
        match self {
            Self::DiscordToWhatsapp => "queue_ds_to_wa",
            Self::WhatsappToDiscord => "queue_wa_to_ds",
        }
    }
}

impl std::fmt::Display for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}
