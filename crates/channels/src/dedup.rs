//! Bounded memory of recently relayed messages.
//!
//! WhatsApp Web has no stable message ids to key on, and the scan loop sees
//! the same "last message" of a chat until something newer arrives. The
//! cache remembers a SHA-256 fingerprint of the chat, sender and text (each
//! length-prefixed) so each message crosses the bridge once.

use std::collections::{HashMap, HashSet, VecDeque};

use sha2::{Digest, Sha256};

pub const DEFAULT_PER_CHAT: usize = 1024;
pub const DEFAULT_MAX_CHATS: usize = 4096;

/// Fingerprint of one observed message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    chat: String,
    digest: [u8; 32],
}

impl Fingerprint {
    pub fn new(chat: &str, sender: &str, text: &str) -> Self {
        let mut hasher = Sha256::new();
        // Length-prefix every field so no split of the bytes collides.
        for field in [chat, sender, text] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
        Self {
            chat: chat.to_string(),
            digest: hasher.finalize().into(),
        }
    }

    pub fn chat(&self) -> &str {
        &self.chat
    }
}

#[derive(Default)]
struct ChatWindow {
    order: VecDeque<[u8; 32]>,
    members: HashSet<[u8; 32]>,
    touched: u64,
}

/// Per-chat FIFO of fingerprints with a cap on the number of chats.
///
/// Each chat keeps at most `per_chat` fingerprints (oldest evicted first).
/// When more than `max_chats` chats are tracked, the one touched least
/// recently is forgotten.
pub struct DedupCache {
    chats: HashMap<String, ChatWindow>,
    per_chat: usize,
    max_chats: usize,
    clock: u64,
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new(DEFAULT_PER_CHAT, DEFAULT_MAX_CHATS)
    }
}

impl DedupCache {
    pub fn new(per_chat: usize, max_chats: usize) -> Self {
        Self {
            chats: HashMap::new(),
            per_chat: per_chat.max(1),
            max_chats: max_chats.max(1),
            clock: 0,
        }
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.chats
            .get(&fingerprint.chat)
            .is_some_and(|w| w.members.contains(&fingerprint.digest))
    }

    /// Record `fingerprint`. Returns `false` if it was already present.
    pub fn insert(&mut self, fingerprint: Fingerprint) -> bool {
        self.clock += 1;
        let clock = self.clock;
        let per_chat = self.per_chat;

        let Fingerprint { chat, digest } = fingerprint;
        let is_new_chat = !self.chats.contains_key(&chat);
        let window = self.chats.entry(chat).or_default();
        window.touched = clock;
        if !window.members.insert(digest) {
            return false;
        }
        window.order.push_back(digest);
        while window.order.len() > per_chat {
            if let Some(old) = window.order.pop_front() {
                window.members.remove(&old);
            }
        }

        if is_new_chat && self.chats.len() > self.max_chats {
            self.evict_stalest();
        }
        true
    }

    /// Number of chats currently tracked.
    pub fn chats(&self) -> usize {
        self.chats.len()
    }

    fn evict_stalest(&mut self) {
        let stalest = self
            .chats
            .iter()
            .min_by_key(|(_, w)| w.touched)
            .map(|(chat, _)| chat.clone());
        if let Some(chat) = stalest {
            self.chats.remove(&chat);
        }
    }
}
