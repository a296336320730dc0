//! User-initiated moderation and content actions.
//!
//! Every action runs the same machine: preconditions are checked before
//! any mutation (`Forbidden`/`InvalidInput` reject immediately), then an
//! optimistic local mutation is applied, the remote write is issued, and
//! the outcome arrives on the notification stream as
//! `ActionConfirmed` or `ActionFailed`. A failed write rolls the
//! optimistic mutation back; a confirmed one needs no further change
//! because subscription redelivery is idempotent.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use palaver_shared::constants::{MAX_ITEM_NAME_LENGTH, MAX_TEXT_LENGTH};
use palaver_shared::error::{ActionError, RemoteError};
use palaver_shared::identity::AccessGate;
use palaver_shared::protocol::{MessageDraft, ReactionAction};
use palaver_shared::types::{ActionKind, ChatId, ItemId, MessageId, ReactionKind, WalletAddress};
use palaver_store::{ConversationStore, Message};

use crate::error::{ClientError, Result};
use crate::events::{notify, ClientNotification};
use crate::remote::RemoteHandle;

/// What an action points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionTarget {
    Message {
        chat_id: ChatId,
        message_id: MessageId,
    },
    Item {
        item_id: ItemId,
    },
}

/// A user-initiated action with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRequest {
    Delete,
    Report,
    Block,
    Rename { new_name: String },
    Share { chat_id: ChatId },
    Download,
    React { kind: ReactionKind },
}

impl ActionRequest {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionRequest::Delete => ActionKind::Delete,
            ActionRequest::Report => ActionKind::Report,
            ActionRequest::Block => ActionKind::Block,
            ActionRequest::Rename { .. } => ActionKind::Rename,
            ActionRequest::Share { .. } => ActionKind::Share,
            ActionRequest::Download => ActionKind::Download,
            ActionRequest::React { .. } => ActionKind::React,
        }
    }
}

/// Ephemeral record of an issued action, held only until its remote write
/// resolves.
#[derive(Debug, Clone)]
pub struct PendingAction {
    pub id: Uuid,
    pub kind: ActionKind,
    pub target: Option<ActionTarget>,
    pub issued_at: DateTime<Utc>,
}

impl PendingAction {
    fn new(kind: ActionKind, target: Option<ActionTarget>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            target,
            issued_at: Utc::now(),
        }
    }
}

/// How to undo an optimistic mutation when the remote write fails.
#[derive(Debug)]
enum Rollback {
    None,
    Reinsert(Message),
    RestoreName { item_id: ItemId, name: String },
    RestoreReaction {
        chat_id: ChatId,
        message_id: MessageId,
        reactor: WalletAddress,
        kind: ReactionKind,
        action: ReactionAction,
    },
}

impl Rollback {
    fn apply(self, store: &Arc<Mutex<ConversationStore>>) {
        let Ok(mut guard) = store.lock() else {
            error!("Store lock poisoned during rollback");
            return;
        };
        match self {
            Rollback::None => {}
            Rollback::Reinsert(message) => {
                if let Err(err) = guard.append(message.to_record()) {
                    warn!(message = %message.id, error = %err, "Rollback reinsert failed");
                }
            }
            Rollback::RestoreName { item_id, name } => {
                guard.rename_item(&item_id, &name);
            }
            Rollback::RestoreReaction {
                chat_id,
                message_id,
                reactor,
                kind,
                action,
            } => {
                guard.apply_reaction(&chat_id, &message_id, reactor, kind, action);
            }
        }
    }
}

pub struct ActionDispatcher {
    store: Arc<Mutex<ConversationStore>>,
    remote: RemoteHandle,
    gate: AccessGate,
    notifications: mpsc::Sender<ClientNotification>,
}

impl ActionDispatcher {
    pub fn new(
        store: Arc<Mutex<ConversationStore>>,
        remote: RemoteHandle,
        gate: AccessGate,
        notifications: mpsc::Sender<ClientNotification>,
    ) -> Self {
        Self {
            store,
            remote,
            gate,
            notifications,
        }
    }

    fn store(&self) -> Result<MutexGuard<'_, ConversationStore>> {
        self.store.lock().map_err(|_| ClientError::StatePoisoned)
    }

    /// Validate and issue an action for `actor`. Returns the pending
    /// action id; the Confirmed/Failed outcome follows on the
    /// notification stream.
    pub fn dispatch(
        &self,
        request: ActionRequest,
        target: ActionTarget,
        actor: Option<&WalletAddress>,
    ) -> Result<Uuid> {
        let actor = actor.ok_or(ClientError::NotConnected)?.clone();
        match (request, target) {
            (
                ActionRequest::Delete,
                ActionTarget::Message {
                    chat_id,
                    message_id,
                },
            ) => self.delete(chat_id, message_id, actor),
            (
                ActionRequest::Report,
                ActionTarget::Message {
                    chat_id,
                    message_id,
                },
            ) => self.report(chat_id, message_id, actor),
            (
                ActionRequest::Block,
                ActionTarget::Message {
                    chat_id,
                    message_id,
                },
            ) => self.block(chat_id, message_id, actor),
            (
                ActionRequest::React { kind },
                ActionTarget::Message {
                    chat_id,
                    message_id,
                },
            ) => self.react(chat_id, message_id, actor, kind),
            (ActionRequest::Rename { new_name }, ActionTarget::Item { item_id }) => {
                self.rename(item_id, new_name)
            }
            (ActionRequest::Share { chat_id }, ActionTarget::Item { item_id }) => {
                self.share(item_id, chat_id)
            }
            (ActionRequest::Download, ActionTarget::Item { item_id }) => self.download(item_id),
            // Message actions aimed at items and item actions aimed at
            // messages.
            _ => Err(ActionError::Forbidden.into()),
        }
    }

    /// Compose and send a new message. The backend assigns the id, so
    /// there is no optimistic append; the message arrives over the
    /// subscription stream.
    pub fn send_message(
        &self,
        chat_id: ChatId,
        actor: Option<&WalletAddress>,
        text: Option<String>,
        image: Option<String>,
    ) -> Result<Uuid> {
        let sender = actor.ok_or(ClientError::NotConnected)?.clone();
        if text.is_none() && image.is_none() {
            return Err(ActionError::InvalidInput("message needs text or an image".into()).into());
        }
        if text.as_ref().is_some_and(|t| t.len() > MAX_TEXT_LENGTH) {
            return Err(ActionError::InvalidInput("message text too long".into()).into());
        }

        let draft = MessageDraft {
            chat_id,
            sender,
            text,
            image,
        };
        let remote = self.remote.clone();
        self.issue(
            PendingAction::new(ActionKind::Send, None),
            async move { remote.create_message(draft).await },
            Rollback::None,
        )
    }

    fn delete(&self, chat_id: ChatId, message_id: MessageId, actor: WalletAddress) -> Result<Uuid> {
        let message = {
            let mut guard = self.store()?;
            let message = guard
                .message(&chat_id, &message_id)
                .ok_or_else(|| ClientError::UnknownMessage(message_id.clone()))?;
            if !self.gate.is_owner(&message.sender, Some(&actor)) {
                return Err(ActionError::Forbidden.into());
            }
            guard.remove(&chat_id, &message_id);
            message
        };

        let remote = self.remote.clone();
        let (c, m) = (chat_id.clone(), message_id.clone());
        self.issue(
            PendingAction::new(
                ActionKind::Delete,
                Some(ActionTarget::Message {
                    chat_id,
                    message_id,
                }),
            ),
            async move { remote.delete_message(c, m).await },
            Rollback::Reinsert(message),
        )
    }

    fn report(&self, chat_id: ChatId, message_id: MessageId, actor: WalletAddress) -> Result<Uuid> {
        {
            let guard = self.store()?;
            let message = guard
                .message(&chat_id, &message_id)
                .ok_or_else(|| ClientError::UnknownMessage(message_id.clone()))?;
            if self.gate.is_owner(&message.sender, Some(&actor)) {
                return Err(ActionError::Forbidden.into());
            }
        }

        let remote = self.remote.clone();
        let (c, m) = (chat_id.clone(), message_id.clone());
        self.issue(
            PendingAction::new(
                ActionKind::Report,
                Some(ActionTarget::Message {
                    chat_id,
                    message_id,
                }),
            ),
            async move { remote.create_report(c, m, actor).await },
            Rollback::None,
        )
    }

    fn block(&self, chat_id: ChatId, message_id: MessageId, actor: WalletAddress) -> Result<Uuid> {
        let blocked = {
            let guard = self.store()?;
            let message = guard
                .message(&chat_id, &message_id)
                .ok_or_else(|| ClientError::UnknownMessage(message_id.clone()))?;
            if self.gate.is_owner(&message.sender, Some(&actor)) {
                return Err(ActionError::Forbidden.into());
            }
            let is_group = guard
                .is_group(&chat_id)
                .ok_or_else(|| ClientError::UnknownConversation(chat_id.clone()))?;
            if is_group {
                return Err(ActionError::Forbidden.into());
            }
            message.sender
        };

        let remote = self.remote.clone();
        self.issue(
            PendingAction::new(
                ActionKind::Block,
                Some(ActionTarget::Message {
                    chat_id,
                    message_id,
                }),
            ),
            async move { remote.create_block(actor, blocked).await },
            Rollback::None,
        )
    }

    fn react(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        actor: WalletAddress,
        kind: ReactionKind,
    ) -> Result<Uuid> {
        let action = {
            let mut guard = self.store()?;
            guard
                .toggle_reaction(&chat_id, &message_id, actor.clone(), kind.clone())
                .ok_or_else(|| ClientError::UnknownMessage(message_id.clone()))?
        };

        let remote = self.remote.clone();
        let (c, m, a, k) = (
            chat_id.clone(),
            message_id.clone(),
            actor.clone(),
            kind.clone(),
        );
        self.issue(
            PendingAction::new(
                ActionKind::React,
                Some(ActionTarget::Message {
                    chat_id: chat_id.clone(),
                    message_id: message_id.clone(),
                }),
            ),
            async move { remote.set_reaction(c, m, a, k, action).await },
            Rollback::RestoreReaction {
                chat_id,
                message_id,
                reactor: actor,
                kind,
                action: action.inverted(),
            },
        )
    }

    fn rename(&self, item_id: ItemId, new_name: String) -> Result<Uuid> {
        let trimmed = new_name.trim();
        if trimmed.is_empty() {
            return Err(ActionError::InvalidInput("item name is empty".into()).into());
        }
        if trimmed.len() > MAX_ITEM_NAME_LENGTH {
            return Err(ActionError::InvalidInput("item name too long".into()).into());
        }

        let previous = self
            .store()?
            .rename_item(&item_id, trimmed)
            .ok_or(ClientError::UnknownItem(item_id))?;

        let remote = self.remote.clone();
        let name = trimmed.to_string();
        self.issue(
            PendingAction::new(ActionKind::Rename, Some(ActionTarget::Item { item_id })),
            async move { remote.rename_item(item_id, name).await },
            Rollback::RestoreName {
                item_id,
                name: previous,
            },
        )
    }

    fn share(&self, item_id: ItemId, chat_id: ChatId) -> Result<Uuid> {
        self.store()?
            .item(&item_id)
            .ok_or(ClientError::UnknownItem(item_id))?;

        let remote = self.remote.clone();
        self.issue(
            PendingAction::new(ActionKind::Share, Some(ActionTarget::Item { item_id })),
            async move { remote.share_item(item_id, chat_id).await },
            Rollback::None,
        )
    }

    fn download(&self, item_id: ItemId) -> Result<Uuid> {
        self.store()?
            .item(&item_id)
            .ok_or(ClientError::UnknownItem(item_id))?;

        let pending = PendingAction::new(ActionKind::Download, Some(ActionTarget::Item { item_id }));
        let id = pending.id;
        notify(
            &self.notifications,
            ClientNotification::ActionIssued {
                action_id: id,
                kind: pending.kind,
            },
        );

        let remote = self.remote.clone();
        let notifications = self.notifications.clone();
        tokio::spawn(async move {
            match remote.download_item(item_id).await {
                Ok(payload) => {
                    info!(action = %pending.id, item = %item_id, bytes = payload.len(), "Download ready");
                    notify(
                        &notifications,
                        ClientNotification::ActionConfirmed {
                            action_id: pending.id,
                            kind: pending.kind,
                        },
                    );
                    notify(
                        &notifications,
                        ClientNotification::DownloadReady {
                            action_id: pending.id,
                            item_id,
                            payload,
                        },
                    );
                }
                Err(error) => {
                    warn!(action = %pending.id, item = %item_id, error = %error, "Download failed");
                    notify(
                        &notifications,
                        ClientNotification::ActionFailed {
                            action_id: pending.id,
                            kind: pending.kind,
                            error,
                        },
                    );
                }
            }
        });
        Ok(id)
    }

    /// Report the action as issued, run the remote write in the
    /// background, and reconcile: confirm, or roll back and report the
    /// failure. The pending record moves into the task and is dropped on
    /// resolution.
    fn issue<F>(&self, pending: PendingAction, write: F, rollback: Rollback) -> Result<Uuid>
    where
        F: Future<Output = std::result::Result<(), RemoteError>> + Send + 'static,
    {
        let id = pending.id;
        notify(
            &self.notifications,
            ClientNotification::ActionIssued {
                action_id: id,
                kind: pending.kind,
            },
        );

        let store = self.store.clone();
        let notifications = self.notifications.clone();
        tokio::spawn(async move {
            match write.await {
                Ok(()) => {
                    info!(action = %pending.id, kind = ?pending.kind, "Action confirmed");
                    notify(
                        &notifications,
                        ClientNotification::ActionConfirmed {
                            action_id: pending.id,
                            kind: pending.kind,
                        },
                    );
                }
                Err(error) => {
                    warn!(
                        action = %pending.id,
                        kind = ?pending.kind,
                        target = ?pending.target,
                        error = %error,
                        "Action failed, rolling back"
                    );
                    rollback.apply(&store);
                    notify(
                        &notifications,
                        ClientNotification::ActionFailed {
                            action_id: pending.id,
                            kind: pending.kind,
                            error,
                        },
                    );
                }
            }
        });
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::DateTime;

    use palaver_shared::protocol::MessageRecord;
    use palaver_shared::types::Reactions;
    use palaver_store::SharedItem;

    use crate::remote::{remote_channel, RemoteCommand};

    const ADMIN: &str = "0xAdmin";
    const ALICE: &str = "0xAlice";
    const BOB: &str = "0xBob";

    fn chat() -> ChatId {
        ChatId::from("chat-1")
    }

    fn record(id: &str, sender: &str) -> MessageRecord {
        MessageRecord {
            id: MessageId::from(id),
            chat_id: chat(),
            sender: WalletAddress::from(sender),
            text: Some("hello".to_string()),
            image: None,
            reactions: Reactions::new(),
            timestamp: DateTime::from_timestamp(1, 0).unwrap(),
        }
    }

    fn message_target(id: &str) -> ActionTarget {
        ActionTarget::Message {
            chat_id: chat(),
            message_id: MessageId::from(id),
        }
    }

    struct Harness {
        dispatcher: ActionDispatcher,
        store: Arc<Mutex<ConversationStore>>,
        notifications: mpsc::Receiver<ClientNotification>,
        commands: mpsc::Receiver<RemoteCommand>,
    }

    fn harness(is_group: bool) -> Harness {
        let store = Arc::new(Mutex::new(ConversationStore::new()));
        {
            let mut guard = store.lock().unwrap();
            guard.upsert_conversation(chat(), is_group);
            guard.append(record("m1", ALICE)).unwrap();
        }
        let (remote, commands) = remote_channel(8);
        let (tx, notifications) = mpsc::channel(64);
        let dispatcher = ActionDispatcher::new(
            store.clone(),
            remote,
            AccessGate::new(WalletAddress::from(ADMIN)),
            tx,
        );
        Harness {
            dispatcher,
            store,
            notifications,
            commands,
        }
    }

    async fn expect_issued(h: &mut Harness, id: Uuid) {
        match h.notifications.recv().await.unwrap() {
            ClientNotification::ActionIssued { action_id, .. } => assert_eq!(action_id, id),
            other => panic!("expected ActionIssued, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_foreign_delete_is_forbidden_and_mutates_nothing() {
        let mut h = harness(false);
        let err = h
            .dispatcher
            .dispatch(
                ActionRequest::Delete,
                message_target("m1"),
                Some(&WalletAddress::from(BOB)),
            )
            .unwrap_err();

        assert_eq!(err, ClientError::Action(ActionError::Forbidden));
        assert_eq!(h.store.lock().unwrap().message_count(&chat()), 1);
        assert!(h.commands.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_delete_applies_optimistically_and_rolls_back_on_failure() {
        let mut h = harness(false);
        let id = h
            .dispatcher
            .dispatch(
                ActionRequest::Delete,
                message_target("m1"),
                Some(&WalletAddress::from(ALICE)),
            )
            .unwrap();

        // Optimistic removal is visible before the backend answers.
        assert!(h.store.lock().unwrap().snapshot(&chat()).is_empty());

        match h.commands.recv().await.unwrap() {
            RemoteCommand::DeleteMessage { reply, .. } => {
                reply.send(Err(RemoteError::Rejected("nope".into()))).unwrap();
            }
            other => panic!("expected DeleteMessage, got {other:?}"),
        }

        expect_issued(&mut h, id).await;
        match h.notifications.recv().await.unwrap() {
            ClientNotification::ActionFailed {
                action_id, error, ..
            } => {
                assert_eq!(action_id, id);
                assert_eq!(error, RemoteError::Rejected("nope".into()));
            }
            other => panic!("expected ActionFailed, got {other:?}"),
        }

        let snapshot = h.store.lock().unwrap().snapshot(&chat());
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, MessageId::from("m1"));
    }

    #[tokio::test]
    async fn test_delete_confirmed_stays_removed() {
        let mut h = harness(false);
        let id = h
            .dispatcher
            .dispatch(
                ActionRequest::Delete,
                message_target("m1"),
                Some(&WalletAddress::from(ALICE)),
            )
            .unwrap();

        match h.commands.recv().await.unwrap() {
            RemoteCommand::DeleteMessage {
                chat_id,
                message_id,
                reply,
            } => {
                assert_eq!(chat_id, chat());
                assert_eq!(message_id, MessageId::from("m1"));
                reply.send(Ok(())).unwrap();
            }
            other => panic!("expected DeleteMessage, got {other:?}"),
        }

        expect_issued(&mut h, id).await;
        assert!(matches!(
            h.notifications.recv().await.unwrap(),
            ClientNotification::ActionConfirmed { .. }
        ));
        assert!(h.store.lock().unwrap().snapshot(&chat()).is_empty());
    }

    #[tokio::test]
    async fn test_block_forbidden_in_group_chats() {
        let mut h = harness(true);
        let err = h
            .dispatcher
            .dispatch(
                ActionRequest::Block,
                message_target("m1"),
                Some(&WalletAddress::from(BOB)),
            )
            .unwrap_err();

        assert_eq!(err, ClientError::Action(ActionError::Forbidden));
        assert!(h.commands.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_block_in_direct_chat_targets_the_sender() {
        let mut h = harness(false);
        h.dispatcher
            .dispatch(
                ActionRequest::Block,
                message_target("m1"),
                Some(&WalletAddress::from(BOB)),
            )
            .unwrap();

        match h.commands.recv().await.unwrap() {
            RemoteCommand::CreateBlock {
                blocker,
                blocked,
                reply,
            } => {
                assert_eq!(blocker, WalletAddress::from(BOB));
                assert_eq!(blocked, WalletAddress::from(ALICE));
                reply.send(Ok(())).unwrap();
            }
            other => panic!("expected CreateBlock, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_report_own_message_is_forbidden() {
        let mut h = harness(false);
        let err = h
            .dispatcher
            .dispatch(
                ActionRequest::Report,
                message_target("m1"),
                Some(&WalletAddress::from(ALICE)),
            )
            .unwrap_err();

        assert_eq!(err, ClientError::Action(ActionError::Forbidden));
        assert!(h.commands.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_rename_trims_and_sends_the_trimmed_name() {
        let mut h = harness(false);
        let item = SharedItem::new("old.txt");
        let item_id = item.id;
        h.store.lock().unwrap().insert_item(item);

        h.dispatcher
            .dispatch(
                ActionRequest::Rename {
                    new_name: "  New Name  ".to_string(),
                },
                ActionTarget::Item { item_id },
                Some(&WalletAddress::from(ALICE)),
            )
            .unwrap();

        // Optimistic rename is already visible.
        assert_eq!(h.store.lock().unwrap().item(&item_id).unwrap().name, "New Name");

        match h.commands.recv().await.unwrap() {
            RemoteCommand::RenameItem {
                new_name, reply, ..
            } => {
                assert_eq!(new_name, "New Name");
                reply.send(Ok(())).unwrap();
            }
            other => panic!("expected RenameItem, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rename_to_whitespace_is_rejected_without_a_remote_call() {
        let mut h = harness(false);
        let item = SharedItem::new("old.txt");
        let item_id = item.id;
        h.store.lock().unwrap().insert_item(item);

        let err = h
            .dispatcher
            .dispatch(
                ActionRequest::Rename {
                    new_name: "   ".to_string(),
                },
                ActionTarget::Item { item_id },
                Some(&WalletAddress::from(ALICE)),
            )
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::Action(ActionError::InvalidInput(_))
        ));
        assert_eq!(h.store.lock().unwrap().item(&item_id).unwrap().name, "old.txt");
        assert!(h.commands.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_rename_restores_the_previous_name() {
        let mut h = harness(false);
        let item = SharedItem::new("old.txt");
        let item_id = item.id;
        h.store.lock().unwrap().insert_item(item);

        let id = h
            .dispatcher
            .dispatch(
                ActionRequest::Rename {
                    new_name: "new.txt".to_string(),
                },
                ActionTarget::Item { item_id },
                Some(&WalletAddress::from(ALICE)),
            )
            .unwrap();

        match h.commands.recv().await.unwrap() {
            RemoteCommand::RenameItem { reply, .. } => {
                reply.send(Err(RemoteError::Timeout)).unwrap();
            }
            other => panic!("expected RenameItem, got {other:?}"),
        }

        expect_issued(&mut h, id).await;
        assert!(matches!(
            h.notifications.recv().await.unwrap(),
            ClientNotification::ActionFailed { .. }
        ));
        assert_eq!(h.store.lock().unwrap().item(&item_id).unwrap().name, "old.txt");
    }

    #[tokio::test]
    async fn test_failed_reaction_restores_prior_membership() {
        let mut h = harness(false);
        let bob = WalletAddress::from(BOB);
        let kind = ReactionKind::from("🔥");

        let id = h
            .dispatcher
            .dispatch(
                ActionRequest::React { kind: kind.clone() },
                message_target("m1"),
                Some(&bob),
            )
            .unwrap();

        {
            let guard = h.store.lock().unwrap();
            let message = guard.message(&chat(), &MessageId::from("m1")).unwrap();
            assert!(message.reactions.get(&kind).unwrap().contains(&bob));
        }

        match h.commands.recv().await.unwrap() {
            RemoteCommand::SetReaction { action, reply, .. } => {
                assert_eq!(action, ReactionAction::Add);
                reply.send(Err(RemoteError::Rejected("no".into()))).unwrap();
            }
            other => panic!("expected SetReaction, got {other:?}"),
        }

        expect_issued(&mut h, id).await;
        assert!(matches!(
            h.notifications.recv().await.unwrap(),
            ClientNotification::ActionFailed { .. }
        ));

        let guard = h.store.lock().unwrap();
        let message = guard.message(&chat(), &MessageId::from("m1")).unwrap();
        assert!(message.reactions.is_empty());
    }

    #[tokio::test]
    async fn test_reaction_echo_converges_with_the_optimistic_state() {
        let mut h = harness(false);
        let bob = WalletAddress::from(BOB);
        let kind = ReactionKind::from("👍");

        h.dispatcher
            .dispatch(
                ActionRequest::React { kind: kind.clone() },
                message_target("m1"),
                Some(&bob),
            )
            .unwrap();

        match h.commands.recv().await.unwrap() {
            RemoteCommand::SetReaction { action, reply, .. } => {
                assert_eq!(action, ReactionAction::Add);
                reply.send(Ok(())).unwrap();
            }
            other => panic!("expected SetReaction, got {other:?}"),
        }

        // The backend echoes the confirmed write over the subscription;
        // the redelivered add must not cancel the optimistic one.
        h.store.lock().unwrap().apply_reaction(
            &chat(),
            &MessageId::from("m1"),
            bob.clone(),
            kind.clone(),
            ReactionAction::Add,
        );

        let guard = h.store.lock().unwrap();
        let message = guard.message(&chat(), &MessageId::from("m1")).unwrap();
        let reactors = message.reactions.get(&kind).unwrap();
        assert_eq!(reactors.len(), 1);
        assert!(reactors.contains(&bob));
    }

    #[tokio::test]
    async fn test_item_actions_on_messages_are_forbidden() {
        let mut h = harness(false);
        let err = h
            .dispatcher
            .dispatch(
                ActionRequest::Rename {
                    new_name: "x".to_string(),
                },
                message_target("m1"),
                Some(&WalletAddress::from(ALICE)),
            )
            .unwrap_err();

        assert_eq!(err, ClientError::Action(ActionError::Forbidden));
        assert!(h.commands.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_download_delivers_the_payload() {
        let mut h = harness(false);
        let item = SharedItem::new("data.bin");
        let item_id = item.id;
        h.store.lock().unwrap().insert_item(item);

        let id = h
            .dispatcher
            .dispatch(
                ActionRequest::Download,
                ActionTarget::Item { item_id },
                Some(&WalletAddress::from(ALICE)),
            )
            .unwrap();

        match h.commands.recv().await.unwrap() {
            RemoteCommand::DownloadItem { reply, .. } => {
                reply.send(Ok(vec![1, 2, 3])).unwrap();
            }
            other => panic!("expected DownloadItem, got {other:?}"),
        }

        expect_issued(&mut h, id).await;
        assert!(matches!(
            h.notifications.recv().await.unwrap(),
            ClientNotification::ActionConfirmed { .. }
        ));
        match h.notifications.recv().await.unwrap() {
            ClientNotification::DownloadReady {
                action_id, payload, ..
            } => {
                assert_eq!(action_id, id);
                assert_eq!(payload, vec![1, 2, 3]);
            }
            other => panic!("expected DownloadReady, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_message_requires_content() {
        let mut h = harness(false);
        let err = h
            .dispatcher
            .send_message(chat(), Some(&WalletAddress::from(ALICE)), None, None)
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::Action(ActionError::InvalidInput(_))
        ));
        assert!(h.commands.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_message_issues_a_draft() {
        let mut h = harness(false);
        h.dispatcher
            .send_message(
                chat(),
                Some(&WalletAddress::from(ALICE)),
                Some("hi there".to_string()),
                None,
            )
            .unwrap();

        match h.commands.recv().await.unwrap() {
            RemoteCommand::CreateMessage { draft, reply } => {
                assert_eq!(draft.chat_id, chat());
                assert_eq!(draft.sender, WalletAddress::from(ALICE));
                assert_eq!(draft.text.as_deref(), Some("hi there"));
                reply.send(Ok(())).unwrap();
            }
            other => panic!("expected CreateMessage, got {other:?}"),
        }

        // No optimistic append: the backend assigns the id and the message
        // arrives via the subscription.
        assert_eq!(h.store.lock().unwrap().message_count(&chat()), 1);
    }

    #[tokio::test]
    async fn test_dispatch_requires_a_connected_wallet() {
        let h = harness(false);
        let err = h
            .dispatcher
            .dispatch(ActionRequest::Delete, message_target("m1"), None)
            .unwrap_err();
        assert_eq!(err, ClientError::NotConnected);
    }
}
