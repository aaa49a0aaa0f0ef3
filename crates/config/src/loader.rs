use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{Error, Result, env_subst::substitute_env, schema::BridgeConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "chatbridge.toml",
    "chatbridge.yaml",
    "chatbridge.yml",
    "chatbridge.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<BridgeConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./chatbridge.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/chatbridge/chatbridge.{toml,yaml,yml,json}` (user-global)
///
/// Returns `BridgeConfig::default()` if no config file is found or the file
/// fails to parse. Env overrides are applied in every case.
pub fn discover_and_load() -> BridgeConfig {
    let mut config = match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                BridgeConfig::default()
            })
        },
        None => {
            debug!("no config file found, using defaults");
            BridgeConfig::default()
        },
    };
    apply_env_overrides(&mut config);
    config
}

/// Overlay well-known environment variables onto a loaded config.
///
/// | Variable | Setting |
/// |---|---|
/// | `DISCORD_TOKEN` | `discord.token` |
/// | `CHATBRIDGE_DATABASE_URL` | `broker.database_url` |
/// | `CHATBRIDGE_MAPPING_PATH` | `mapping.path` |
/// | `CHATBRIDGE_WHATSAPP_URL` | `whatsapp.sidecar_url` |
pub fn apply_env_overrides(config: &mut BridgeConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(config: &mut BridgeConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(token) = get("DISCORD_TOKEN") {
        config.discord.token = Secret::new(token);
    }
    if let Some(url) = get("CHATBRIDGE_DATABASE_URL") {
        config.broker.database_url = url;
    }
    if let Some(path) = get("CHATBRIDGE_MAPPING_PATH") {
        config.mapping.path = PathBuf::from(path);
    }
    if let Some(url) = get("CHATBRIDGE_WHATSAPP_URL") {
        config.whatsapp.sidecar_url = url;
    }
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/chatbridge/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "chatbridge").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> Result<BridgeConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        other => Err(Error::UnsupportedFormat {
            extension: other.to_string(),
        }),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::schema::BrokerConfig, secrecy::ExposeSecret, std::io::Write};

    fn write_file(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = write_file(
            &dir,
            "chatbridge.yaml",
            "mapping:\n  path: routes.json\nrelay:\n  poll_timeout_ms: 250\n",
        );
        let cfg = load_config(&yaml).unwrap();
        assert_eq!(cfg.mapping.path, PathBuf::from("routes.json"));
        assert_eq!(cfg.relay.poll_timeout_ms, 250);

        let json = write_file(
            &dir,
            "chatbridge.json",
            r#"{"broker": {"database_url": "sqlite::memory:"}}"#,
        );
        let cfg = load_config(&json).unwrap();
        assert_eq!(cfg.broker.database_url, "sqlite::memory:");
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "chatbridge.ini", "x=1");
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = load_config(Path::new("/nonexistent/chatbridge.toml")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn env_overrides_win_over_file_values() {
        let mut cfg = BridgeConfig::default();
        apply_env_overrides_with(&mut cfg, |name| match name {
            "DISCORD_TOKEN" => Some("tok".into()),
            "CHATBRIDGE_MAPPING_PATH" => Some("/etc/chatbridge/mapping.json".into()),
            "CHATBRIDGE_DATABASE_URL" => Some("   ".into()),
            _ => None,
        });
        assert_eq!(cfg.discord.token.expose_secret(), "tok");
        assert_eq!(
            cfg.mapping.path,
            PathBuf::from("/etc/chatbridge/mapping.json")
        );
        // blank values are ignored
        assert_eq!(cfg.broker.database_url, BrokerConfig::default().database_url);
    }
}
