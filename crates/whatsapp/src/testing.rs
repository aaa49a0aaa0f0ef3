//! In-memory [`WhatsAppSession`] for tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::{
    Error, Result, WhatsAppSession,
    types::{ChatMessage, ChatSummary},
};

/// Chats never become read, like a browser page that is re-scanned before
/// anyone looks at it.
#[derive(Default)]
pub(crate) struct MockSession {
    pub unread: Vec<ChatSummary>,
    pub chats: HashMap<String, Vec<ChatMessage>>,
    pub fail_open: HashSet<String>,
    pub fail_send: bool,
    pub fail_unread: bool,
    pub opened: Vec<String>,
    pub sent: Vec<(String, String)>,
    current: Option<String>,
}

impl MockSession {
    pub fn with_chat(mut self, name: &str, messages: &[(&str, &str)]) -> Self {
        self.unread.push(ChatSummary::named(name));
        self.chats.insert(
            name.to_string(),
            messages
                .iter()
                .map(|(sender, text)| ChatMessage {
                    sender: Some(sender.to_string()),
                    text: Some(text.to_string()),
                    from_me: false,
                })
                .collect(),
        );
        self
    }
}

#[async_trait]
impl WhatsAppSession for MockSession {
    async fn unread_chats(&mut self) -> Result<Vec<ChatSummary>> {
        if self.fail_unread {
            return Err(Error::connection("page crashed"));
        }
        Ok(self.unread.clone())
    }

    async fn open_chat(&mut self, name: &str) -> Result<bool> {
        self.opened.push(name.to_string());
        if self.fail_open.contains(name) {
            return Err(Error::connection(format!("cannot open {name}")));
        }
        let found = self.chats.contains_key(name);
        self.current = found.then(|| name.to_string());
        Ok(found)
    }

    async fn collect_messages(&mut self) -> Result<Vec<ChatMessage>> {
        Ok(self
            .current
            .as_ref()
            .and_then(|name| self.chats.get(name))
            .cloned()
            .unwrap_or_default())
    }

    async fn send_message(&mut self, chat: &str, text: &str) -> Result<()> {
        if self.fail_send {
            return Err(Error::connection("send button missing"));
        }
        self.sent.push((chat.to_string(), text.to_string()));
        Ok(())
    }
}
