//! Message operations on the conversation sequences.
//!
//! Sequences stay ordered by `(timestamp, id)` regardless of arrival
//! order, and every operation may be replayed any number of times without
//! changing the outcome.

use tracing::{debug, trace};

use palaver_shared::protocol::{MessageRecord, ReactionAction};
use palaver_shared::types::{ChatId, MessageId, ReactionKind, WalletAddress};

use crate::error::{Result, StoreError};
use crate::models::Message;
use crate::store::ConversationStore;

impl ConversationStore {
    /// Merge an inbound record into its conversation.
    ///
    /// A new id is inserted at its chronological position (timestamp order,
    /// id tie-break); a known id has its mutable fields (text, image,
    /// reactions) updated in place and the sequence length does not grow.
    /// Returns `true` when the record was newly inserted.
    pub fn append(&mut self, record: MessageRecord) -> Result<bool> {
        if !record.has_content() {
            return Err(StoreError::EmptyMessage);
        }

        let chat_id = record.chat_id.clone();
        let conv = self.conversation_entry(&chat_id);

        if let Some(pos) = conv.messages.iter().position(|m| m.id == record.id) {
            // id and timestamp are immutable once assigned; the entry keeps
            // its position.
            let message = &mut conv.messages[pos];
            message.text = record.text;
            message.image = record.image;
            message.reactions = record.reactions;
            trace!(chat = %chat_id, message = %message.id, "Updated message in place");
            return Ok(false);
        }

        let message = Message::from_record(record);
        let pos = conv
            .messages
            .partition_point(|m| m.sort_key() < message.sort_key());
        trace!(chat = %chat_id, message = %message.id, pos, "Inserted message");
        conv.messages.insert(pos, message);
        Ok(true)
    }

    /// Remove a message by id. Removing an absent id is a no-op; returns
    /// whether anything was removed.
    pub fn remove(&mut self, chat_id: &ChatId, message_id: &MessageId) -> bool {
        let Some(conv) = self.conversations.get_mut(chat_id) else {
            return false;
        };
        let before = conv.messages.len();
        conv.messages.retain(|m| m.id != *message_id);
        let removed = conv.messages.len() != before;
        if removed {
            debug!(chat = %chat_id, message = %message_id, "Removed message");
        }
        removed
    }

    /// Set `reactor`'s membership in the `kind` reaction set of one
    /// message per `action`. Setting a state that already holds changes
    /// nothing, so redelivered events are harmless. A no-op (`None`) when
    /// the message is absent; otherwise returns whether the set changed.
    pub fn apply_reaction(
        &mut self,
        chat_id: &ChatId,
        message_id: &MessageId,
        reactor: WalletAddress,
        kind: ReactionKind,
        action: ReactionAction,
    ) -> Option<bool> {
        let conv = self.conversations.get_mut(chat_id)?;
        let message = conv.messages.iter_mut().find(|m| m.id == *message_id)?;

        let changed = match action {
            ReactionAction::Add => message.reactions.entry(kind).or_default().insert(reactor),
            ReactionAction::Remove => {
                let removed = message
                    .reactions
                    .get_mut(&kind)
                    .is_some_and(|set| set.remove(&reactor));
                if removed && message.reactions.get(&kind).is_some_and(|set| set.is_empty()) {
                    message.reactions.remove(&kind);
                }
                removed
            }
        };
        Some(changed)
    }

    /// Local helper for user-initiated reactions: flips `reactor`'s
    /// current membership and returns the action that was applied, so the
    /// caller can issue the same intent remotely. `None` when the message
    /// is absent.
    pub fn toggle_reaction(
        &mut self,
        chat_id: &ChatId,
        message_id: &MessageId,
        reactor: WalletAddress,
        kind: ReactionKind,
    ) -> Option<ReactionAction> {
        let present = self
            .conversations
            .get(chat_id)?
            .messages
            .iter()
            .find(|m| m.id == *message_id)?
            .reactions
            .get(&kind)
            .is_some_and(|set| set.contains(&reactor));

        let action = if present {
            ReactionAction::Remove
        } else {
            ReactionAction::Add
        };
        self.apply_reaction(chat_id, message_id, reactor, kind, action)?;
        Some(action)
    }

    /// Owned copy of one conversation's messages in display order. An
    /// unknown conversation yields an empty sequence.
    pub fn snapshot(&self, chat_id: &ChatId) -> Vec<Message> {
        self.conversations
            .get(chat_id)
            .map(|c| c.messages.clone())
            .unwrap_or_default()
    }

    /// Owned copy of one message, if present.
    pub fn message(&self, chat_id: &ChatId, message_id: &MessageId) -> Option<Message> {
        self.conversations
            .get(chat_id)?
            .messages
            .iter()
            .find(|m| m.id == *message_id)
            .cloned()
    }

    pub fn message_count(&self, chat_id: &ChatId) -> usize {
        self.conversations.get(chat_id).map_or(0, |c| c.len())
    }
}
