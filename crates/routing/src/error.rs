use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The broker could not be read or written.
    #[error(transparent)]
    Broker(#[from] chatbridge_broker::Error),

    #[error("failed to read mapping file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("mapping file is not a JSON object of strings: {0}")]
    Json(#[from] serde_json::Error),

    /// The mapping file parsed but does not describe a one-to-one routing table.
    #[error("invalid mapping: {message}")]
    InvalidMapping { message: String },
}

impl Error {
    #[must_use]
    pub fn invalid_mapping(message: impl std::fmt::Display) -> Self {
        Self::InvalidMapping {
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
