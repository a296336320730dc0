//! The store handle.
//!
//! [`ConversationStore`] is the authoritative in-memory view of every open
//! conversation and the shared-item registry. The client wraps it in
//! `Arc<Mutex<..>>` so the ingest task and the action dispatcher mutate the
//! same state; every operation is a short critical section and idempotent
//! under at-least-once delivery.

use std::collections::HashMap;

use tracing::debug;

use palaver_shared::types::{ChatId, ItemId};

use crate::models::{Conversation, SharedItem};

#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    pub(crate) conversations: HashMap<ChatId, Conversation>,
    pub(crate) items: HashMap<ItemId, SharedItem>,
}

impl ConversationStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a conversation, or update its group flag if already known.
    /// Existing messages are kept.
    pub fn upsert_conversation(&mut self, chat_id: ChatId, is_group: bool) {
        self.conversations
            .entry(chat_id.clone())
            .and_modify(|c| c.is_group = is_group)
            .or_insert_with(|| {
                debug!(chat = %chat_id, is_group, "Registering conversation");
                Conversation::new(chat_id.clone(), is_group)
            });
    }

    pub fn conversation(&self, chat_id: &ChatId) -> Option<&Conversation> {
        self.conversations.get(chat_id)
    }

    /// Group flag of a known conversation, `None` when unknown.
    pub fn is_group(&self, chat_id: &ChatId) -> Option<bool> {
        self.conversations.get(chat_id).map(|c| c.is_group)
    }

    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }

    /// Conversation entry for an inbound event, created on first sight.
    /// One-to-one is assumed until `upsert_conversation` says otherwise.
    pub(crate) fn conversation_entry(&mut self, chat_id: &ChatId) -> &mut Conversation {
        self.conversations
            .entry(chat_id.clone())
            .or_insert_with(|| Conversation::new(chat_id.clone(), false))
    }
}
