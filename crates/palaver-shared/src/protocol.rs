//! Wire shapes exchanged with the storage backend.
//!
//! The subscription contract delivers [`ChatEvent`]s keyed by conversation;
//! the write contract consumes [`MessageDraft`]s. Events are encoded with
//! bincode on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ChatId, MessageId, ReactionKind, Reactions, WalletAddress};

/// A message as delivered by the backend. The id is assigned by the
/// backend and immutable once assigned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageRecord {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender: WalletAddress,
    /// Message text. At least one of `text` / `image` is present.
    pub text: Option<String>,
    /// Opaque reference to an image attachment.
    pub image: Option<String>,
    pub reactions: Reactions,
    pub timestamp: DateTime<Utc>,
}

impl MessageRecord {
    /// A record with neither text nor an image carries nothing to show.
    pub fn has_content(&self) -> bool {
        self.text.is_some() || self.image.is_some()
    }
}

/// An outgoing message before the backend has assigned it an id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageDraft {
    pub chat_id: ChatId,
    pub sender: WalletAddress,
    pub text: Option<String>,
    pub image: Option<String>,
}

impl MessageDraft {
    pub fn has_content(&self) -> bool {
        self.text.is_some() || self.image.is_some()
    }
}

/// Whether a reaction is being added or removed.
///
/// Carried on the wire so that reaction events state the desired
/// membership instead of a toggle; redelivering the same event any number
/// of times leaves the same state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReactionAction {
    Add,
    Remove,
}

impl ReactionAction {
    /// The action that undoes this one.
    pub fn inverted(self) -> Self {
        match self {
            Self::Add => Self::Remove,
            Self::Remove => Self::Add,
        }
    }
}

/// Inbound subscription events for one conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChatEvent {
    /// A message was created, or an existing one changed (edit, reaction
    /// state refresh). Merged by id.
    MessageCreated(MessageRecord),

    /// A message was deleted.
    MessageDeleted {
        chat_id: ChatId,
        message_id: MessageId,
    },

    /// One reactor's membership in one reaction set changed.
    ReactionChanged {
        chat_id: ChatId,
        message_id: MessageId,
        reactor: WalletAddress,
        kind: ReactionKind,
        action: ReactionAction,
    },
}

impl ChatEvent {
    /// The conversation this event belongs to.
    pub fn chat_id(&self) -> &ChatId {
        match self {
            ChatEvent::MessageCreated(record) => &record.chat_id,
            ChatEvent::MessageDeleted { chat_id, .. } => chat_id,
            ChatEvent::ReactionChanged { chat_id, .. } => chat_id,
        }
    }

    /// Serialize to binary (bincode)
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}
