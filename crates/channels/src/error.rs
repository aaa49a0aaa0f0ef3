use std::error::Error as StdError;

/// Crate-wide result type for relay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed relay errors.
///
/// Every kind is recoverable inside a running loop; the variant decides
/// whether the loop backs off before trying again.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Broker read or write failed.
    #[error(transparent)]
    Broker(#[from] chatbridge_broker::Error),

    /// Route lookup failed (not a missing route, which is `Ok(None)`).
    #[error(transparent)]
    Routing(#[from] chatbridge_routing::Error),

    /// A queued payload could not be decoded for this consumer.
    #[error("malformed relay payload: {message}")]
    MalformedPayload { message: String },

    /// The platform rejected or failed a send.
    #[error("delivery to {destination} failed: {source}")]
    SendFailed {
        destination: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// The platform session is not ready.
    #[error("platform unavailable: {message}")]
    Unavailable { message: String },

    /// JSON (de)serialization failed.
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn malformed(message: impl std::fmt::Display) -> Self {
        Self::MalformedPayload {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn unavailable(message: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn send_failed(
        destination: impl std::fmt::Display,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::SendFailed {
            destination: destination.to_string(),
            source: Box::new(source),
        }
    }

    /// `true` for failures where hammering the dependency again right away
    /// would not help.
    pub fn wants_backoff(&self) -> bool {
        !matches!(self, Self::MalformedPayload { .. } | Self::SerdeJson(_))
    }
}
