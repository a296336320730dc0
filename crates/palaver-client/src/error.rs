use thiserror::Error;

use palaver_shared::error::{ActionError, RemoteError};
use palaver_shared::types::{ChatId, ItemId, MessageId};

/// Errors surfaced by the client layer. None is fatal to the process; all
/// are scoped to one conversation or one action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("wallet is not connected")]
    NotConnected,

    #[error("conversation {0} already has an active subscription")]
    AlreadySubscribed(ChatId),

    #[error("unknown conversation {0}")]
    UnknownConversation(ChatId),

    #[error("unknown message {0}")]
    UnknownMessage(MessageId),

    #[error("unknown shared item {0}")]
    UnknownItem(ItemId),

    #[error("no context menu is open")]
    MenuClosed,

    #[error("store lock poisoned")]
    StatePoisoned,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
