//! Durable broker keyspace for the bridge.
//!
//! Two hash tables hold the bidirectional routing table and two list-backed
//! queues carry relay payloads between the platform adapters. Everything
//! lives in one SQLite database so a restart keeps both routes and any
//! payloads that were queued but not yet consumed.

pub mod error;
pub mod keys;
pub mod sqlite;
pub mod store;

pub use {
    error::{Error, Result},
    keys::{MapTable, Queue},
    sqlite::SqliteBroker,
    store::{MappingSnapshot, MappingStore, RelayQueue},
};

/// Run database migrations for the broker keyspace.
///
/// Creates the `bridge_hash` and `bridge_list` tables. Called by
/// [`SqliteBroker::connect`]; call it yourself before
/// [`SqliteBroker::with_pool`] when sharing a pool.
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .set_ignore_missing(true)
        .run(pool)
        .await?;
    Ok(())
}
