//! The storage backend contract.
//!
//! The persistent backend is an external collaborator: it drains the
//! command channel and answers each command over its oneshot reply.
//! [`RemoteHandle`] wraps the sender half with async methods that hide the
//! reply plumbing, so callers just see point writes that succeed or fail.

use tokio::sync::{mpsc, oneshot};

use palaver_shared::error::RemoteError;
use palaver_shared::protocol::{ChatEvent, MessageDraft, ReactionAction};
use palaver_shared::types::{ChatId, ItemId, MessageId, ReactionKind, WalletAddress};

type RemoteResult<T> = std::result::Result<T, RemoteError>;
type Reply<T> = oneshot::Sender<RemoteResult<T>>;

/// Commands sent *to* the storage backend.
#[derive(Debug)]
pub enum RemoteCommand {
    /// Create a message. The backend assigns the id and delivers the full
    /// record over the conversation's subscription stream.
    CreateMessage { draft: MessageDraft, reply: Reply<()> },
    DeleteMessage {
        chat_id: ChatId,
        message_id: MessageId,
        reply: Reply<()>,
    },
    SetReaction {
        chat_id: ChatId,
        message_id: MessageId,
        reactor: WalletAddress,
        kind: ReactionKind,
        action: ReactionAction,
        reply: Reply<()>,
    },
    CreateReport {
        chat_id: ChatId,
        message_id: MessageId,
        reporter: WalletAddress,
        reply: Reply<()>,
    },
    CreateBlock {
        blocker: WalletAddress,
        blocked: WalletAddress,
        reply: Reply<()>,
    },
    RenameItem {
        item_id: ItemId,
        new_name: String,
        reply: Reply<()>,
    },
    ShareItem {
        item_id: ItemId,
        chat_id: ChatId,
        reply: Reply<()>,
    },
    /// Fetch an item's payload.
    DownloadItem { item_id: ItemId, reply: Reply<Vec<u8>> },
    /// Open the event stream for one conversation. The stream is lazy,
    /// unbounded and non-restartable: once the backend drops its sender,
    /// the subscriber must issue a fresh `Subscribe`.
    Subscribe {
        chat_id: ChatId,
        reply: Reply<mpsc::Receiver<ChatEvent>>,
    },
}

/// Cloneable handle to the backend command channel.
#[derive(Debug, Clone)]
pub struct RemoteHandle {
    tx: mpsc::Sender<RemoteCommand>,
}

/// Create the command channel: the handle goes to the client, the receiver
/// to the backend implementation.
pub fn remote_channel(capacity: usize) -> (RemoteHandle, mpsc::Receiver<RemoteCommand>) {
    let (tx, rx) = mpsc::channel(capacity);
    (RemoteHandle { tx }, rx)
}

impl RemoteHandle {
    async fn send(&self, command: RemoteCommand) -> RemoteResult<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| RemoteError::ChannelClosed)
    }

    async fn recv<T>(reply: oneshot::Receiver<RemoteResult<T>>) -> RemoteResult<T> {
        reply.await.map_err(|_| RemoteError::ChannelClosed)?
    }

    pub async fn create_message(&self, draft: MessageDraft) -> RemoteResult<()> {
        let (tx, rx) = oneshot::channel();
        self.send(RemoteCommand::CreateMessage { draft, reply: tx })
            .await?;
        Self::recv(rx).await
    }

    pub async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> RemoteResult<()> {
        let (tx, rx) = oneshot::channel();
        self.send(RemoteCommand::DeleteMessage {
            chat_id,
            message_id,
            reply: tx,
        })
        .await?;
        Self::recv(rx).await
    }

    pub async fn set_reaction(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        reactor: WalletAddress,
        kind: ReactionKind,
        action: ReactionAction,
    ) -> RemoteResult<()> {
        let (tx, rx) = oneshot::channel();
        self.send(RemoteCommand::SetReaction {
            chat_id,
            message_id,
            reactor,
            kind,
            action,
            reply: tx,
        })
        .await?;
        Self::recv(rx).await
    }

    pub async fn create_report(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        reporter: WalletAddress,
    ) -> RemoteResult<()> {
        let (tx, rx) = oneshot::channel();
        self.send(RemoteCommand::CreateReport {
            chat_id,
            message_id,
            reporter,
            reply: tx,
        })
        .await?;
        Self::recv(rx).await
    }

    pub async fn create_block(
        &self,
        blocker: WalletAddress,
        blocked: WalletAddress,
    ) -> RemoteResult<()> {
        let (tx, rx) = oneshot::channel();
        self.send(RemoteCommand::CreateBlock {
            blocker,
            blocked,
            reply: tx,
        })
        .await?;
        Self::recv(rx).await
    }

    pub async fn rename_item(&self, item_id: ItemId, new_name: String) -> RemoteResult<()> {
        let (tx, rx) = oneshot::channel();
        self.send(RemoteCommand::RenameItem {
            item_id,
            new_name,
            reply: tx,
        })
        .await?;
        Self::recv(rx).await
    }

    pub async fn share_item(&self, item_id: ItemId, chat_id: ChatId) -> RemoteResult<()> {
        let (tx, rx) = oneshot::channel();
        self.send(RemoteCommand::ShareItem {
            item_id,
            chat_id,
            reply: tx,
        })
        .await?;
        Self::recv(rx).await
    }

    pub async fn download_item(&self, item_id: ItemId) -> RemoteResult<Vec<u8>> {
        let (tx, rx) = oneshot::channel();
        self.send(RemoteCommand::DownloadItem { item_id, reply: tx })
            .await?;
        Self::recv(rx).await
    }

    pub async fn subscribe(&self, chat_id: ChatId) -> RemoteResult<mpsc::Receiver<ChatEvent>> {
        let (tx, rx) = oneshot::channel();
        self.send(RemoteCommand::Subscribe { chat_id, reply: tx })
            .await?;
        Self::recv(rx).await
    }
}
