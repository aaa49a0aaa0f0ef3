//! Config schema for the bridge process.

use std::{path::PathBuf, time::Duration};

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub broker: BrokerConfig,
    pub mapping: MappingConfig,
    pub relay: RelayConfig,
    pub discord: DiscordConfig,
    pub whatsapp: WhatsAppConfig,
}

/// Connection to the durable store holding routes and relay queues.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// sqlx connection URL, e.g. `sqlite://chatbridge.db?mode=rwc`.
    pub database_url: String,
    /// Connection attempts at startup before giving up.
    pub connect_attempts: u32,
    /// Fixed delay between startup connection attempts (seconds).
    pub connect_delay_secs: u64,
    pub max_connections: u32,
}

impl BrokerConfig {
    pub fn connect_delay(&self) -> Duration {
        Duration::from_secs(self.connect_delay_secs)
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://chatbridge.db?mode=rwc".into(),
            connect_attempts: 5,
            connect_delay_secs: 2,
            max_connections: 5,
        }
    }
}

/// Static routing table loaded at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// JSON file of `{"<discord channel id>": "<whatsapp chat name>"}`.
    pub path: PathBuf,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("mapping.json"),
        }
    }
}

/// Timing of the queue drain loops shared by both adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// How long a single queue pop waits before re-checking for shutdown (ms).
    pub poll_timeout_ms: u64,
}

impl RelayConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_timeout_ms: 1_000,
        }
    }
}

/// Discord bot account.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token from the Discord developer portal.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,
    /// Sleep after a failed relay iteration (seconds).
    pub error_backoff_secs: u64,
}

impl DiscordConfig {
    /// `true` when a non-empty, fully substituted token is present.
    pub fn has_token(&self) -> bool {
        let token = self.token.expose_secret();
        !token.trim().is_empty() && !token.contains("${")
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"[REDACTED]")
            .field("error_backoff_secs", &self.error_backoff_secs)
            .finish()
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            error_backoff_secs: 2,
        }
    }
}

/// WhatsApp Web session driven through the automation sidecar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatsAppConfig {
    /// WebSocket URL of the sidecar.
    pub sidecar_url: String,
    /// Interval between unread-chat scans (ms).
    pub scan_interval_ms: u64,
    /// Timeout for a single sidecar request (seconds).
    pub request_timeout_secs: u64,
    /// Sleep after a failed relay iteration (seconds).
    pub error_backoff_secs: u64,
    /// Fingerprints remembered per chat before the oldest is evicted.
    pub dedup_per_chat: usize,
    /// Chats tracked by the dedup cache before the least recently seen is dropped.
    pub dedup_max_chats: usize,
}

impl WhatsAppConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            sidecar_url: "ws://127.0.0.1:8787/ws".into(),
            scan_interval_ms: 2_000,
            request_timeout_secs: 30,
            error_backoff_secs: 5,
            dedup_per_chat: 1_024,
            dedup_max_chats: 4_096,
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_bridge_timings() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.broker.connect_attempts, 5);
        assert_eq!(cfg.broker.connect_delay(), Duration::from_secs(2));
        assert_eq!(cfg.relay.poll_timeout(), Duration::from_secs(1));
        assert_eq!(cfg.discord.error_backoff(), Duration::from_secs(2));
        assert_eq!(cfg.whatsapp.error_backoff(), Duration::from_secs(5));
        assert_eq!(cfg.mapping.path, PathBuf::from("mapping.json"));
        assert!(!cfg.discord.has_token());
    }

    #[test]
    fn deserialize_partial_toml() {
        let raw = r#"
            [discord]
            token = "abc.def"

            [whatsapp]
            scan_interval_ms = 500
        "#;
        let cfg: BridgeConfig = toml::from_str(raw).unwrap();
        assert!(cfg.discord.has_token());
        assert_eq!(cfg.discord.token.expose_secret(), "abc.def");
        assert_eq!(cfg.whatsapp.scan_interval(), Duration::from_millis(500));
        // untouched sections keep their defaults
        assert_eq!(cfg.whatsapp.dedup_per_chat, 1_024);
        assert_eq!(cfg.broker.connect_attempts, 5);
    }

    #[test]
    fn unsubstituted_token_is_not_a_token() {
        let cfg = DiscordConfig {
            token: Secret::new("${DISCORD_TOKEN}".into()),
            ..Default::default()
        };
        assert!(!cfg.has_token());
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = DiscordConfig {
            token: Secret::new("very-secret".into()),
            ..Default::default()
        };
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("very-secret"));
        assert!(rendered.contains("REDACTED"));
    }
}
