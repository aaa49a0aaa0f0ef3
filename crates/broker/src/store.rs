use std::time::Duration;

use async_trait::async_trait;

use crate::{MapTable, Queue, Result};

/// Both route tables at one point in time, sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingSnapshot {
    pub discord_to_whatsapp: Vec<(String, String)>,
    pub whatsapp_to_discord: Vec<(String, String)>,
}

impl MappingSnapshot {
    pub fn is_empty(&self) -> bool {
        self.discord_to_whatsapp.is_empty() && self.whatsapp_to_discord.is_empty()
    }
}

/// Durable, bidirectional routing table.
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Replace both tables with `pairs` (`(discord_id, chat_name)`) in one
    /// atomic batch. Readers see either the old tables or the new ones.
    async fn replace_all(&self, pairs: &[(String, String)]) -> Result<()>;

    /// Look up `field` in one table.
    async fn get(&self, table: MapTable, field: &str) -> Result<Option<String>>;

    /// Write `discord_id ↔ chat_name` into both tables, dropping any stale
    /// entries that previously pointed at either side.
    async fn insert_pair(&self, discord_id: &str, chat_name: &str) -> Result<()>;

    async fn snapshot(&self) -> Result<MappingSnapshot>;
}

/// Durable FIFO queues carrying serialized relay payloads.
#[async_trait]
pub trait RelayQueue: Send + Sync {
    /// Append a payload at the tail of `queue`.
    async fn push(&self, queue: Queue, payload: &str) -> Result<()>;

    /// Remove and return the oldest payload, waiting up to `timeout` for one
    /// to arrive. `Ok(None)` means the timeout elapsed.
    async fn pop(&self, queue: Queue, timeout: Duration) -> Result<Option<String>>;

    async fn len(&self, queue: Queue) -> Result<u64>;
}
