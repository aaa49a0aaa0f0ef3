use chatbridge_common::FromMessage;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("websocket: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sidecar connection: {0}")]
    Connection(String),

    #[error("sidecar did not answer {method} in time")]
    Timeout { method: String },

    #[error("sidecar rejected {method}: {message}")]
    Sidecar { method: String, message: String },

    #[error(transparent)]
    Relay(#[from] chatbridge_channels::Error),

    #[error("{0}")]
    Message(String),
}

impl Error {
    #[must_use]
    pub fn connection(message: impl std::fmt::Display) -> Self {
        Self::Connection(message.to_string())
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

chatbridge_common::impl_context!();
