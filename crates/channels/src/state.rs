use std::fmt;

use tokio::sync::watch;

/// Lifecycle of a platform adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    Disconnected,
    /// Establishing the platform session.
    Connecting,
    /// Session is up; the relay worker is not running yet.
    Ready,
    /// Session is up and the relay worker is draining the queue.
    Running,
}

impl fmt::Display for AdapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Running => "running",
        })
    }
}

/// Publishes an adapter's [`AdapterState`] to anyone watching.
#[derive(Clone)]
pub struct StateHandle {
    tx: watch::Sender<AdapterState>,
}

impl Default for StateHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl StateHandle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(AdapterState::Disconnected);
        Self { tx }
    }

    pub fn set(&self, state: AdapterState) {
        self.tx.send_replace(state);
    }

    pub fn current(&self) -> AdapterState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<AdapterState> {
        self.tx.subscribe()
    }
}
