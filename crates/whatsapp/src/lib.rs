//! WhatsApp Web side of the bridge.
//!
//! WhatsApp Web is driven through a browser automation sidecar reached over
//! a WebSocket. A [`ChatScanner`] polls unread chats and relays their newest
//! message to `queue_wa_to_ds`; a relay worker drains `queue_ds_to_wa` into
//! the chats. Both share one session behind a lock.

pub mod adapter;
pub mod error;
pub mod outbound;
pub mod scan;
pub mod session;
pub mod sidecar;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use {
    adapter::WhatsAppAdapter,
    error::{Error, Result},
    outbound::WhatsAppOutbound,
    scan::{ChatScanner, ScanReport},
    session::WhatsAppSession,
    sidecar::SidecarSession,
};
