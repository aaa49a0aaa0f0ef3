use thiserror::Error;

/// Failures talking to the broker database.
///
/// Every variant means the broker is unavailable or misbehaving; callers in
/// steady-state loops back off and retry, startup code gives up after its
/// retry budget.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub type Result<T> = std::result::Result<T, Error>;
