//! Inbound side: poll WhatsApp Web for unread chats and relay their newest
//! message.
//!
//! WhatsApp Web offers no event stream, so the same message is seen on every
//! scan until something newer arrives. The [`InboundRelay`] is built with a
//! dedup cache to relay it only once.

use std::{collections::HashSet, time::Duration};

use {
    chatbridge_channels::{InboundMessage, InboundRelay, RelayOutcome, SessionLock},
    chatbridge_routing::Identity,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use crate::{Error, Result, WhatsAppSession, types::ChatMessage};

/// Counters for one pass over the unread chats.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    pub chats: usize,
    pub relayed: usize,
    pub failed: usize,
}

pub struct ChatScanner<S> {
    session: SessionLock<S>,
    relay: InboundRelay,
    interval: Duration,
    error_backoff: Duration,
}

impl<S: WhatsAppSession> ChatScanner<S> {
    pub fn new(
        session: SessionLock<S>,
        relay: InboundRelay,
        interval: Duration,
        error_backoff: Duration,
    ) -> Self {
        Self {
            session,
            relay,
            interval,
            error_backoff,
        }
    }

    /// Process every unread chat once.
    ///
    /// Only listing the unread chats can fail the scan; a failure on one
    /// chat is logged and the scan moves on.
    pub async fn scan_once(&self) -> Result<ScanReport> {
        let chats = self.session.lock().await.unread_chats().await?;

        let mut report = ScanReport::default();
        let mut seen = HashSet::new();
        for chat in &chats {
            let Some(name) = chat.display_name() else {
                warn!(?chat, "unread chat without a name");
                continue;
            };
            if !seen.insert(name) {
                continue;
            }
            report.chats += 1;

            match self.process_chat(name).await {
                Ok(RelayOutcome::Relayed { destination }) => {
                    report.relayed += 1;
                    info!(chat = name, %destination, "whatsapp message queued for discord");
                },
                Ok(outcome) => debug!(chat = name, ?outcome, "whatsapp chat not relayed"),
                Err(e) => {
                    report.failed += 1;
                    warn!(chat = name, error = %e, "failed to process whatsapp chat");
                },
            }
        }
        Ok(report)
    }

    async fn process_chat(&self, name: &str) -> Result<RelayOutcome> {
        let messages = {
            let mut session = self.session.lock().await;
            if !session.open_chat(name).await? {
                return Err(Error::Sidecar {
                    method: "chat.open".into(),
                    message: format!("chat {name:?} not found"),
                });
            }
            session.collect_messages().await?
        };

        let Some(last) = messages.iter().rev().find(|m| !m.text().trim().is_empty()) else {
            return Ok(RelayOutcome::Empty);
        };
        Ok(self.relay.relay(to_inbound(name, last)).await?)
    }

    /// Scan every `interval` until cancelled.
    pub async fn run(self, cancel: CancellationToken) {
        info!(interval_ms = self.interval.as_millis() as u64, "whatsapp chat scanner started");
        loop {
            if cancel.is_cancelled() {
                break;
            }
            let pause = match self.scan_once().await {
                Ok(_) => self.interval,
                Err(e) => {
                    error!(error = %e, "whatsapp scan failed");
                    self.error_backoff
                },
            };
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(pause) => {},
            }
        }
        info!("whatsapp chat scanner stopped");
    }
}

fn to_inbound(chat: &str, message: &ChatMessage) -> InboundMessage {
    let sender = message
        .sender
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(chat);
    InboundMessage {
        chat: Identity::Named(chat.to_string()),
        sender: sender.to_string(),
        text: message.text().to_string(),
        from_bot: false,
        from_self: message.from_me,
    }
}
