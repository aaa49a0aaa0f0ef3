//! Configuration loading and env substitution.
//!
//! Config files: `chatbridge.toml`, `chatbridge.yaml`, or `chatbridge.json`
//! Searched in `./` then `~/.config/chatbridge/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{
        BridgeConfig, BrokerConfig, DiscordConfig, MappingConfig, RelayConfig, WhatsAppConfig,
    },
};
