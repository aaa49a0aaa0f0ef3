use async_trait::async_trait;

use crate::{
    Result,
    types::{ChatMessage, ChatSummary},
};

/// A stateful WhatsApp Web session.
///
/// The session drives a single browser page, so calls must not interleave;
/// callers go through the adapter's
/// [`SessionLock`](chatbridge_channels::SessionLock).
#[async_trait]
pub trait WhatsAppSession: Send + 'static {
    /// Chats with unread messages.
    async fn unread_chats(&mut self) -> Result<Vec<ChatSummary>>;

    /// Focus the chat called `name`. `Ok(false)` if it could not be found.
    async fn open_chat(&mut self, name: &str) -> Result<bool>;

    /// Messages visible in the currently open chat, oldest first.
    async fn collect_messages(&mut self) -> Result<Vec<ChatMessage>>;

    async fn send_message(&mut self, chat: &str, text: &str) -> Result<()>;
}
