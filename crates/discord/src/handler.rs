//! Discord event handler for serenity.
//!
//! Turns channel messages into relay traffic and starts the relay worker
//! once the gateway session is ready.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
};

use {
    chatbridge_broker::RelayQueue,
    chatbridge_channels::{
        AdapterState, InboundMessage, InboundRelay, RelayOutcome, RelayWorker, SessionLock,
        StateHandle, WorkerConfig,
    },
    chatbridge_routing::Identity,
    serenity::{
        all::{Cache, Context, EventHandler, GatewayIntents, GuildId, Message, Ready, User},
        async_trait,
        utils::{ContentSafeOptions, content_safe},
    },
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{DiscordOutbound, markdown::strip_bot_mention};

/// Handler for Discord gateway events.
pub struct DiscordHandler {
    relay: InboundRelay,
    queue: Arc<dyn RelayQueue>,
    cancel: CancellationToken,
    worker_config: WorkerConfig,
    state: StateHandle,
    /// Zero until the first `ready` event.
    bot_user_id: AtomicU64,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DiscordHandler {
    pub fn new(
        relay: InboundRelay,
        queue: Arc<dyn RelayQueue>,
        cancel: CancellationToken,
        worker_config: WorkerConfig,
        state: StateHandle,
    ) -> Self {
        Self {
            relay,
            queue,
            cancel,
            worker_config,
            state,
            bot_user_id: AtomicU64::new(0),
            worker: Mutex::new(None),
        }
    }

    /// Required gateway intents for the bot.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
    }

    pub fn bot_user_id(&self) -> Option<u64> {
        match self.bot_user_id.load(Ordering::Acquire) {
            0 => None,
            id => Some(id),
        }
    }

    /// Handle of the relay worker, if `ready` has started it.
    pub fn take_worker(&self) -> Option<JoinHandle<()>> {
        self.worker.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

/// Text as Discord users read it: the bot's own mention removed, other
/// user, role and channel mentions rendered as names.
pub(crate) fn readable_text(
    cache: &Arc<Cache>,
    content: &str,
    mentions: &[User],
    bot_user_id: Option<u64>,
) -> String {
    let stripped = strip_bot_mention(content, bot_user_id);
    content_safe(cache, &stripped, &ContentSafeOptions::default(), mentions)
        .trim()
        .to_string()
}

/// Guild nickname, then global name, then user name.
fn author_name(msg: &Message) -> &str {
    msg.member
        .as_ref()
        .and_then(|m| m.nick.as_deref())
        .unwrap_or_else(|| msg.author.display_name())
}

/// Build the relay input for a channel message.
pub(crate) fn to_inbound(
    channel_id: u64,
    author_id: u64,
    author_is_bot: bool,
    author_name: &str,
    text: String,
    bot_user_id: Option<u64>,
) -> InboundMessage {
    InboundMessage {
        chat: Identity::Numeric(channel_id),
        sender: author_name.to_string(),
        text,
        from_bot: author_is_bot,
        from_self: bot_user_id == Some(author_id),
    }
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            "discord bot ready"
        );
        self.bot_user_id
            .store(ready.user.id.get(), Ordering::Release);
        self.state.set(AdapterState::Ready);

        // `ready` fires again after every reconnect; one worker is enough.
        let mut worker = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        if worker.is_none() {
            let relay_worker = RelayWorker::new(
                Arc::clone(&self.queue),
                Arc::new(DiscordOutbound),
                SessionLock::new(Arc::clone(&ctx.http)),
                self.cancel.clone(),
                self.worker_config,
            );
            *worker = Some(relay_worker.spawn());
        }
        self.state.set(AdapterState::Running);
    }

    async fn message(&self, ctx: Context, msg: Message) {
        // Skip bot messages to prevent loops
        if msg.author.bot {
            return;
        }

        let channel_id = msg.channel_id.get();
        let bot_user_id = self.bot_user_id();
        let text = readable_text(&ctx.cache, &msg.content, &msg.mentions, bot_user_id);
        let inbound = to_inbound(
            channel_id,
            msg.author.id.get(),
            msg.author.bot,
            author_name(&msg),
            text,
            bot_user_id,
        );

        match self.relay.relay(inbound).await {
            Ok(RelayOutcome::Relayed { destination }) => {
                debug!(channel_id, %destination, "discord message relayed");
            },
            Ok(outcome) => {
                debug!(channel_id, ?outcome, "discord message not relayed");
            },
            Err(e) => {
                warn!(channel_id, error = %e, "failed to relay discord message");
            },
        }
    }

    async fn cache_ready(&self, _ctx: Context, guilds: Vec<GuildId>) {
        debug!(guild_count = guilds.len(), "discord cache ready");
    }
}
