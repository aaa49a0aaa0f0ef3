//! Bidirectional address resolution between Discord channels and WhatsApp chats.
//!
//! The routing table is a bijection stored twice in the broker (once per
//! direction). A static JSON mapping file is the source of truth at startup:
//! [`Router::initialize`] replaces both tables with its contents in one
//! atomic batch. Routes can be added afterwards with [`Router::add_route`].
//!
//! Lookup direction follows the identity kind: a numeric Discord channel id
//! resolves to a chat name, a chat name resolves to a channel id.

pub mod error;
pub mod identity;
pub mod mapping;
pub mod router;

pub use {
    error::{Error, Result},
    identity::Identity,
    mapping::MappingFile,
    router::{InitOutcome, Router},
};
