//! Shared types and error helpers used across the chatbridge crates.

pub mod error;
pub mod types;

pub use {
    error::FromMessage,
    types::Platform,
};
