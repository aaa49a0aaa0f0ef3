//! SQLite-backed broker using sqlx.

use std::{
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use {
    async_trait::async_trait,
    sqlx::{SqlitePool, sqlite::SqlitePoolOptions},
    tokio::{sync::Notify, time::Instant},
    tracing::{debug, trace},
};

use crate::{
    MapTable, Queue, Result,
    store::{MappingSnapshot, MappingStore, RelayQueue},
};

/// Upper bound on how long a waiting pop sleeps before re-reading the
/// queue. Pushes from this process wake waiters immediately; pushes from
/// another process are picked up at this granularity.
const POLL_TICK: Duration = Duration::from_millis(100);

/// Broker keyspace stored in SQLite.
///
/// Cloning is cheap: clones share the pool and the wake-up signal.
#[derive(Clone)]
pub struct SqliteBroker {
    pool: SqlitePool,
    pushed: Arc<Notify>,
}

impl std::fmt::Debug for SqliteBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBroker")
            .field("connections", &self.pool.size())
            .field("closed", &self.pool.is_closed())
            .finish_non_exhaustive()
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

impl SqliteBroker {
    /// Open a pool on `database_url` and run migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(database_url)
            .await?;

        crate::run_migrations(&pool).await?;
        debug!(database_url, "broker connected");

        Ok(Self::with_pool(pool))
    }

    /// Use an existing pool (migrations must already be run).
    pub fn with_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            pushed: Arc::new(Notify::new()),
        }
    }

    /// Round-trip a trivial query to prove the database is reachable.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close every pooled connection. Further calls fail.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Take the oldest payload of `queue`. An empty queue is detected with a
    /// plain read so idle polling never takes the write lock.
    async fn try_pop(&self, queue: Queue) -> Result<Option<String>> {
        loop {
            let Some(id) = sqlx::query_scalar::<_, i64>(
                "SELECT id FROM bridge_list WHERE list = ? ORDER BY id LIMIT 1",
            )
            .bind(queue.key())
            .fetch_optional(&self.pool)
            .await?
            else {
                return Ok(None);
            };

            let payload = sqlx::query_scalar::<_, String>(
                "DELETE FROM bridge_list WHERE id = ? RETURNING payload",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
            // `None` means another consumer took this row first.
            if payload.is_some() {
                return Ok(payload);
            }
        }
    }
}

#[async_trait]
impl MappingStore for SqliteBroker {
    async fn replace_all(&self, pairs: &[(String, String)]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM bridge_hash WHERE hash IN (?, ?)")
            .bind(MapTable::DiscordToWhatsapp.key())
            .bind(MapTable::WhatsappToDiscord.key())
            .execute(&mut *tx)
            .await?;

        for (discord_id, chat_name) in pairs {
            for (table, field, value) in [
                (MapTable::DiscordToWhatsapp, discord_id, chat_name),
                (MapTable::WhatsappToDiscord, chat_name, discord_id),
            ] {
                sqlx::query("INSERT OR REPLACE INTO bridge_hash (hash, field, value) VALUES (?, ?, ?)")
                    .bind(table.key())
                    .bind(field)
                    .bind(value)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        debug!(routes = pairs.len(), "route tables replaced");
        Ok(())
    }

    async fn get(&self, table: MapTable, field: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar::<_, String>(
            "SELECT value FROM bridge_hash WHERE hash = ? AND field = ?",
        )
        .bind(table.key())
        .bind(field)
        .fetch_optional(&self.pool)
        .await?;
        Ok(value)
    }

    async fn insert_pair(&self, discord_id: &str, chat_name: &str) -> Result<()> {
        let forward = MapTable::DiscordToWhatsapp.key();
        let backward = MapTable::WhatsappToDiscord.key();
        let mut tx = self.pool.begin().await?;

        // Drop the reverse entry of whatever chat `discord_id` pointed at before.
        sqlx::query(
            "DELETE FROM bridge_hash WHERE hash = ? AND field IN
               (SELECT value FROM bridge_hash WHERE hash = ? AND field = ?)",
        )
        .bind(backward)
        .bind(forward)
        .bind(discord_id)
        .execute(&mut *tx)
        .await?;

        // Drop the forward entry of whatever channel `chat_name` pointed at before.
        sqlx::query(
            "DELETE FROM bridge_hash WHERE hash = ? AND field IN
               (SELECT value FROM bridge_hash WHERE hash = ? AND field = ?)",
        )
        .bind(forward)
        .bind(backward)
        .bind(chat_name)
        .execute(&mut *tx)
        .await?;

        for (table, field, value) in [(forward, discord_id, chat_name), (backward, chat_name, discord_id)] {
            sqlx::query(
                "INSERT INTO bridge_hash (hash, field, value) VALUES (?, ?, ?)
                 ON CONFLICT(hash, field) DO UPDATE SET value = excluded.value",
            )
            .bind(table)
            .bind(field)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn snapshot(&self) -> Result<MappingSnapshot> {
        // Both reads share one transaction so a concurrent replace_all is
        // seen entirely or not at all.
        let mut tx = self.pool.begin().await?;
        let mut tables = Vec::with_capacity(2);
        for table in [MapTable::DiscordToWhatsapp, MapTable::WhatsappToDiscord] {
            let rows = sqlx::query_as::<_, (String, String)>(
                "SELECT field, value FROM bridge_hash WHERE hash = ? ORDER BY field",
            )
            .bind(table.key())
            .fetch_all(&mut *tx)
            .await?;
            tables.push(rows);
        }
        tx.commit().await?;

        let whatsapp_to_discord = tables.pop().unwrap_or_default();
        let discord_to_whatsapp = tables.pop().unwrap_or_default();
        Ok(MappingSnapshot {
            discord_to_whatsapp,
            whatsapp_to_discord,
        })
    }
}

#[async_trait]
impl RelayQueue for SqliteBroker {
    async fn push(&self, queue: Queue, payload: &str) -> Result<()> {
        sqlx::query("INSERT INTO bridge_list (list, payload, created_at) VALUES (?, ?, ?)")
            .bind(queue.key())
            .bind(payload)
            .bind(now_ms())
            .execute(&self.pool)
            .await?;
        self.pushed.notify_waiters();
        trace!(%queue, "payload pushed");
        Ok(())
    }

    async fn pop(&self, queue: Queue, timeout: Duration) -> Result<Option<String>> {
        let deadline = Instant::now() + timeout;
        loop {
            // Register for wake-ups before reading so a push racing with the
            // read below is not missed.
            let pushed = self.pushed.notified();

            if let Some(payload) = self.try_pop(queue).await? {
                return Ok(Some(payload));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let _ = tokio::time::timeout((deadline - now).min(POLL_TICK), pushed).await;
        }
    }

    async fn len(&self, queue: Queue) -> Result<u64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bridge_list WHERE list = ?")
            .bind(queue.key())
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}
