//! Relay core shared by the platform adapters.
//!
//! An adapter observes messages on its platform and hands them to
//! [`InboundRelay`], which filters, deduplicates, resolves the destination and
//! pushes a [`RelayMessage`] onto the queue towards the other platform. A
//! [`RelayWorker`] on the other side drains that queue and delivers through
//! the platform's [`PlatformOutbound`] while holding the adapter's
//! [`SessionLock`]. Adapters never talk to each other directly.

pub mod dedup;
pub mod error;
pub mod inbound;
pub mod message;
pub mod outbound;
pub mod queues;
pub mod state;
pub mod worker;

pub use {
    dedup::DedupCache,
    error::{Error, Result},
    inbound::{InboundMessage, InboundRelay, RelayOutcome},
    message::RelayMessage,
    outbound::{PlatformOutbound, SessionLock},
    queues::PlatformQueues,
    state::{AdapterState, StateHandle},
    worker::{PollOutcome, RelayWorker, WorkerConfig},
};
