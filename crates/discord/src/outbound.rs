use std::sync::Arc;

use {
    async_trait::async_trait,
    chatbridge_channels::{Error, PlatformOutbound, RelayMessage, Result},
    chatbridge_common::Platform,
    serenity::{all::ChannelId, http::Http},
};

/// Posts relayed messages into Discord channels.
#[derive(Debug, Default)]
pub struct DiscordOutbound;

/// Target channel of `message`, or a malformed-payload error.
pub(crate) fn channel_of(message: &RelayMessage) -> Result<ChannelId> {
    match message.destination.as_numeric() {
        // Snowflakes are never zero and `ChannelId::new` rejects it.
        Some(0) | None => Err(Error::malformed(format!(
            "{} is not a discord channel id",
            message.destination
        ))),
        Some(id) => Ok(ChannelId::new(id)),
    }
}

#[async_trait]
impl PlatformOutbound for DiscordOutbound {
    type Session = Arc<Http>;

    fn platform(&self) -> Platform {
        Platform::Discord
    }

    async fn deliver(&self, http: &mut Arc<Http>, message: &RelayMessage) -> Result<()> {
        let channel = channel_of(message)?;
        channel
            .say(&**http, message.render())
            .await
            .map_err(|e| Error::send_failed(channel, e))?;
        Ok(())
    }
}
