//! Notifications delivered to the presentational layer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use palaver_shared::error::RemoteError;
use palaver_shared::types::{ActionKind, ChatId, ItemId, MessageId, WalletAddress};

/// Everything the UI layer may react to: new messages, conversation
/// changes, the action outcome stream, and subscription loss.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientNotification {
    /// A new message was inserted into a conversation.
    MessageReceived {
        chat_id: ChatId,
        message_id: MessageId,
        sender: WalletAddress,
        timestamp: DateTime<Utc>,
    },

    /// An existing message changed or was removed; re-read the snapshot.
    ConversationUpdated { chat_id: ChatId },

    /// An action passed its preconditions and its remote write is
    /// outstanding.
    ActionIssued { action_id: Uuid, kind: ActionKind },

    /// The remote write succeeded; the optimistic state is authoritative.
    ActionConfirmed { action_id: Uuid, kind: ActionKind },

    /// The remote write failed; any optimistic mutation has been rolled
    /// back.
    ActionFailed {
        action_id: Uuid,
        kind: ActionKind,
        error: RemoteError,
    },

    /// A download completed with the item's payload.
    DownloadReady {
        action_id: Uuid,
        item_id: ItemId,
        payload: Vec<u8>,
    },

    /// Resubscription gave up; the conversation no longer receives live
    /// events until it is reopened.
    SubscriptionLost { chat_id: ChatId },
}

/// Push a notification without blocking; a full or closed channel is
/// logged and the notification dropped.
pub(crate) fn notify(tx: &mpsc::Sender<ClientNotification>, notification: ClientNotification) {
    if let Err(e) = tx.try_send(notification) {
        tracing::warn!(error = %e, "Dropping client notification");
    }
}
