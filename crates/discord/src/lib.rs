//! Discord side of the bridge, on top of serenity.
//!
//! Messages posted in mapped channels are pushed to `queue_ds_to_wa`; a relay
//! worker started on the first `ready` event drains `queue_wa_to_ds` into the
//! channels.

pub mod adapter;
pub mod error;
pub mod handler;
pub mod markdown;
pub mod outbound;

pub use {
    adapter::DiscordAdapter,
    error::{Error, Result},
    handler::DiscordHandler,
    outbound::DiscordOutbound,
};
