use std::sync::{Arc, Mutex};

use {
    chatbridge_broker::RelayQueue,
    chatbridge_common::Platform,
    chatbridge_routing::{Identity, Router},
    tracing::{debug, info},
};

use crate::{
    DedupCache, PlatformQueues, RelayMessage, Result,
    dedup::Fingerprint,
};

/// A message observed on a platform, before routing.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Where it was posted (channel id or chat name).
    pub chat: Identity,
    pub sender: String,
    pub text: String,
    pub from_bot: bool,
    /// Posted by the bridge's own account.
    pub from_self: bool,
}

/// What [`InboundRelay::relay`] did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Pushed onto the queue towards `destination`.
    Relayed { destination: Identity },
    /// Sent by a bot or by the bridge itself.
    Ignored,
    /// Nothing to relay.
    Empty,
    /// Already relayed earlier in this process.
    Duplicate,
    /// The chat has no route to the other platform.
    NoRoute,
}

/// Inbound half of an adapter: filter, dedup, resolve, enqueue.
pub struct InboundRelay {
    platform: Platform,
    router: Router,
    queue: Arc<dyn RelayQueue>,
    dedup: Option<Mutex<DedupCache>>,
}

impl InboundRelay {
    pub fn new(platform: Platform, router: Router, queue: Arc<dyn RelayQueue>) -> Self {
        Self {
            platform,
            router,
            queue,
            dedup: None,
        }
    }

    /// Drop messages already relayed once. For platforms observed by
    /// re-scanning chat state rather than through an event stream.
    #[must_use]
    pub fn with_dedup(mut self, cache: DedupCache) -> Self {
        self.dedup = Some(Mutex::new(cache));
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Route `message` to the other platform.
    ///
    /// A miss or filtered message is an `Ok` outcome; only broker failures
    /// are errors. A fingerprint is remembered only once the message has
    /// been either queued or found to have no route, so a broker hiccup
    /// lets the next scan retry it.
    pub async fn relay(&self, message: InboundMessage) -> Result<RelayOutcome> {
        if message.from_bot || message.from_self {
            return Ok(RelayOutcome::Ignored);
        }
        if message.text.trim().is_empty() {
            return Ok(RelayOutcome::Empty);
        }

        let fingerprint = self.dedup.as_ref().map(|_| {
            Fingerprint::new(&message.chat.to_string(), &message.sender, &message.text)
        });
        if let Some(fp) = &fingerprint
            && self.with_cache(|cache| cache.contains(fp))
        {
            debug!(platform = %self.platform, chat = %message.chat, "duplicate message skipped");
            return Ok(RelayOutcome::Duplicate);
        }

        let Some(destination) = self.router.resolve(&message.chat).await? else {
            info!(platform = %self.platform, chat = %message.chat, "no route for chat, message dropped");
            self.remember(fingerprint);
            return Ok(RelayOutcome::NoRoute);
        };

        let payload = RelayMessage::new(
            message.sender,
            message.text,
            destination.clone(),
            self.platform,
        )
        .encode()?;
        let queue = self.platform.outbound_queue();
        self.queue.push(queue, &payload).await?;
        self.remember(fingerprint);

        debug!(
            platform = %self.platform,
            chat = %message.chat,
            %destination,
            %queue,
            "message queued"
        );
        Ok(RelayOutcome::Relayed { destination })
    }

    fn remember(&self, fingerprint: Option<Fingerprint>) {
        if let Some(fp) = fingerprint {
            self.with_cache(|cache| cache.insert(fp));
        }
    }

    fn with_cache<T: Default>(&self, f: impl FnOnce(&mut DedupCache) -> T) -> T {
        match &self.dedup {
            Some(cache) => f(&mut cache.lock().unwrap_or_else(|e| e.into_inner())),
            None => T::default(),
        }
    }
}
