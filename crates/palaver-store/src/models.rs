//! Domain model structs held in the in-memory store.
//!
//! Every struct derives `Serialize` and `Deserialize` so snapshots can be
//! handed directly to the UI layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use palaver_shared::protocol::MessageRecord;
use palaver_shared::types::{ChatId, ItemId, MessageId, Reactions, WalletAddress};

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message as held in a conversation sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Backend-assigned identifier, immutable once assigned.
    pub id: MessageId,
    /// The conversation this message belongs to.
    pub chat_id: ChatId,
    /// Wallet address of the sender.
    pub sender: WalletAddress,
    /// Message text, if any.
    pub text: Option<String>,
    /// Opaque image attachment reference, if any.
    pub image: Option<String>,
    /// Reaction state: kind -> reacting addresses.
    pub reactions: Reactions,
    /// When the message was sent (as reported by the sender).
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn from_record(record: MessageRecord) -> Self {
        Self {
            id: record.id,
            chat_id: record.chat_id,
            sender: record.sender,
            text: record.text,
            image: record.image,
            reactions: record.reactions,
            timestamp: record.timestamp,
        }
    }

    pub fn to_record(&self) -> MessageRecord {
        MessageRecord {
            id: self.id.clone(),
            chat_id: self.chat_id.clone(),
            sender: self.sender.clone(),
            text: self.text.clone(),
            image: self.image.clone(),
            reactions: self.reactions.clone(),
            timestamp: self.timestamp,
        }
    }

    /// Display-order key: timestamp, then id as the tie-break.
    pub fn sort_key(&self) -> (DateTime<Utc>, &MessageId) {
        (self.timestamp, &self.id)
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// A conversation and its ordered, deduplicated message sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    pub chat_id: ChatId,
    /// Whether this is a group conversation (affects block availability).
    pub is_group: bool,
    /// Messages in `(timestamp, id)` order.
    pub(crate) messages: Vec<Message>,
}

impl Conversation {
    pub fn new(chat_id: ChatId, is_group: bool) -> Self {
        Self {
            chat_id,
            is_group,
            messages: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Shared item
// ---------------------------------------------------------------------------

/// A shared file or status update targeted by the context menu. Created
/// externally; only the name is mutable, via rename.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SharedItem {
    pub id: ItemId,
    pub name: String,
}

impl SharedItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
        }
    }
}
