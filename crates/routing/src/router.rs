use std::{path::Path, sync::Arc};

use {
    chatbridge_broker::{MapTable, MappingSnapshot, MappingStore},
    tracing::{debug, info, warn},
};

use crate::{Identity, MappingFile, Result};

/// Result of [`Router::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// The file was loaded and replaced both route tables.
    Loaded { routes: usize },
    /// No file at the configured path; the stored routes were left as they were.
    Missing,
}

/// Resolves identities across the bridge using the broker's route tables.
///
/// Holds no state of its own, so any number of routers over the same store
/// agree with each other.
#[derive(Clone)]
pub struct Router {
    store: Arc<dyn MappingStore>,
}

impl Router {
    pub fn new(store: Arc<dyn MappingStore>) -> Self {
        Self { store }
    }

    /// Sync the route tables from the mapping file at `path`.
    ///
    /// A missing file is not an error: the bridge keeps running on whatever
    /// routes the broker already holds. An invalid file is rejected before
    /// the store is touched.
    pub async fn initialize(&self, path: &Path) -> Result<InitOutcome> {
        let Some(file) = MappingFile::load(path)? else {
            warn!(
                path = %path.display(),
                "no mapping file, using routes already in the broker"
            );
            return Ok(InitOutcome::Missing);
        };

        let pairs = file.to_pairs();
        self.store.replace_all(&pairs).await?;
        info!(path = %path.display(), routes = pairs.len(), "route tables synced from mapping file");
        Ok(InitOutcome::Loaded {
            routes: pairs.len(),
        })
    }

    /// Find the identity on the other side of the bridge.
    ///
    /// `Ok(None)` means there is no route. A stored channel id that no longer
    /// parses is logged and treated the same way.
    pub async fn resolve(&self, origin: &Identity) -> Result<Option<Identity>> {
        match origin {
            Identity::Numeric(channel_id) => {
                let chat = self
                    .store
                    .get(MapTable::DiscordToWhatsapp, &channel_id.to_string())
                    .await?;
                debug!(%origin, found = chat.is_some(), "resolved discord channel");
                Ok(chat.map(Identity::Named))
            },
            Identity::Named(chat) => {
                let Some(raw) = self.store.get(MapTable::WhatsappToDiscord, chat).await? else {
                    debug!(%origin, found = false, "resolved whatsapp chat");
                    return Ok(None);
                };
                match raw.trim().parse::<u64>() {
                    Ok(channel_id) => Ok(Some(Identity::Numeric(channel_id))),
                    Err(_) => {
                        warn!(chat = %chat, value = %raw, "stored route is not a channel id");
                        Ok(None)
                    },
                }
            },
        }
    }

    /// Register `channel_id ↔ chat_name` without touching the mapping file.
    ///
    /// Any route previously held by either side is replaced.
    pub async fn add_route(&self, channel_id: u64, chat_name: &str) -> Result<()> {
        if chat_name.trim().is_empty() {
            return Err(crate::Error::invalid_mapping(format!(
                "channel {channel_id} cannot map to an empty chat name"
            )));
        }
        self.store
            .insert_pair(&channel_id.to_string(), chat_name)
            .await?;
        info!(channel_id, chat = chat_name, "route added");
        Ok(())
    }

    /// Current contents of both route tables.
    pub async fn routes(&self) -> Result<MappingSnapshot> {
        Ok(self.store.snapshot().await?)
    }
}
