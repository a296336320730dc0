//! The client facade handed to the embedding shell.
//!
//! [`ChatClient`] wires the store, identity gate, ingest tasks, action
//! dispatcher and context menu together. The presentational layer uses
//! only this surface: `snapshot`, the dispatch entry points, the menu
//! state, and the notification stream returned by [`ChatClient::new`].

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use palaver_shared::identity::{AccessGate, Route};
use palaver_shared::types::{
    ActionKind, ChatId, ItemId, MessageId, ReactionKind, WalletAddress,
};
use palaver_store::{ConversationStore, Message, SharedItem};

use crate::config::{ClientConfig, ResubscribePolicy};
use crate::dispatcher::{ActionDispatcher, ActionRequest, ActionTarget};
use crate::error::{ClientError, Result};
use crate::events::ClientNotification;
use crate::ingest::spawn_ingest;
use crate::menu::{ContextMenuSession, OpenMenu};
use crate::remote::RemoteHandle;
use crate::state::ClientState;

pub struct ChatClient {
    gate: AccessGate,
    store: Arc<Mutex<ConversationStore>>,
    remote: RemoteHandle,
    dispatcher: ActionDispatcher,
    menu: ContextMenuSession,
    state: ClientState,
    notifications: mpsc::Sender<ClientNotification>,
    resubscribe: ResubscribePolicy,
}

impl ChatClient {
    /// Build a client against a backend handle. Returns the client and
    /// the notification stream for the UI layer. Must be called inside a
    /// tokio runtime; ingest and reconciliation run as background tasks.
    pub fn new(config: ClientConfig, remote: RemoteHandle) -> (Self, mpsc::Receiver<ClientNotification>) {
        let (tx, rx) = mpsc::channel(config.notification_buffer);
        let store = Arc::new(Mutex::new(ConversationStore::new()));
        let gate = AccessGate::new(config.admin_address);
        let dispatcher =
            ActionDispatcher::new(store.clone(), remote.clone(), gate.clone(), tx.clone());

        let client = Self {
            gate,
            store,
            remote,
            dispatcher,
            menu: ContextMenuSession::new(),
            state: ClientState::new(),
            notifications: tx,
            resubscribe: config.resubscribe,
        };
        (client, rx)
    }

    // ------------------------------------------------------------------
    // Wallet session
    // ------------------------------------------------------------------

    pub fn wallet_connected(&mut self, address: WalletAddress) {
        info!(wallet = %address.short(), "Wallet connected");
        self.state.wallet = Some(address);
    }

    pub fn wallet_disconnected(&mut self) {
        info!("Wallet disconnected");
        self.state.wallet = None;
    }

    pub fn wallet(&self) -> Option<&WalletAddress> {
        self.state.wallet.as_ref()
    }

    /// Whether the connected wallet may navigate to `route`.
    pub fn can_access(&self, route: Route) -> bool {
        self.gate.can_access(route, self.state.wallet.as_ref())
    }

    // ------------------------------------------------------------------
    // Conversations
    // ------------------------------------------------------------------

    /// Open a conversation: register it in the store and start its ingest
    /// subscription. A conversation can hold only one active subscription.
    pub fn open_conversation(&mut self, chat_id: ChatId, is_group: bool) -> Result<()> {
        if self.state.subscriptions.contains_key(&chat_id) {
            return Err(ClientError::AlreadySubscribed(chat_id));
        }
        self.store
            .lock()
            .map_err(|_| ClientError::StatePoisoned)?
            .upsert_conversation(chat_id.clone(), is_group);

        let handle = spawn_ingest(
            chat_id.clone(),
            self.remote.clone(),
            self.store.clone(),
            self.notifications.clone(),
            self.resubscribe.clone(),
        );
        self.state.subscriptions.insert(chat_id, handle);
        Ok(())
    }

    /// Close a conversation's subscription. Ingested state stays in the
    /// store, and still-outstanding action writes resolve on their own.
    pub fn close_conversation(&mut self, chat_id: &ChatId) {
        if let Some(handle) = self.state.subscriptions.remove(chat_id) {
            debug!(chat = %chat_id, "Closing conversation");
            let _ = handle.stop();
        }
    }

    /// Ordered, deduplicated view of one conversation.
    pub fn snapshot(&self, chat_id: &ChatId) -> Result<Vec<Message>> {
        Ok(self
            .store
            .lock()
            .map_err(|_| ClientError::StatePoisoned)?
            .snapshot(chat_id))
    }

    /// Register an externally created shared item.
    pub fn register_item(&mut self, item: SharedItem) -> Result<()> {
        self.store
            .lock()
            .map_err(|_| ClientError::StatePoisoned)?
            .insert_item(item);
        Ok(())
    }

    pub fn item(&self, id: &ItemId) -> Result<Option<SharedItem>> {
        Ok(self
            .store
            .lock()
            .map_err(|_| ClientError::StatePoisoned)?
            .item(id))
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    /// Dispatch an action as the connected wallet.
    pub fn dispatch(&self, request: ActionRequest, target: ActionTarget) -> Result<Uuid> {
        self.dispatcher
            .dispatch(request, target, self.state.wallet.as_ref())
    }

    pub fn send_message(
        &self,
        chat_id: ChatId,
        text: Option<String>,
        image: Option<String>,
    ) -> Result<Uuid> {
        self.dispatcher
            .send_message(chat_id, self.state.wallet.as_ref(), text, image)
    }

    pub fn toggle_reaction(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        kind: ReactionKind,
    ) -> Result<Uuid> {
        self.dispatch(
            ActionRequest::React { kind },
            ActionTarget::Message {
                chat_id,
                message_id,
            },
        )
    }

    // ------------------------------------------------------------------
    // Context menu
    // ------------------------------------------------------------------

    pub fn open_menu(&mut self, target: ActionTarget, x: f32, y: f32) {
        self.menu.open(target, x, y);
    }

    pub fn close_menu(&mut self) {
        self.menu.close();
    }

    pub fn menu(&self) -> Option<&OpenMenu> {
        self.menu.current()
    }

    /// Pointer/tap outside the menu bounds dismisses it.
    pub fn menu_dismiss_at(&mut self, x: f32, y: f32) -> bool {
        self.menu.dismiss_at(x, y)
    }

    /// Actions offered for the open menu's target, given the connected
    /// wallet's relationship to it.
    pub fn menu_actions(&self) -> Result<Vec<ActionKind>> {
        let Some(menu) = self.menu.current() else {
            return Ok(Vec::new());
        };
        match &menu.target {
            ActionTarget::Message {
                chat_id,
                message_id,
            } => {
                let guard = self.store.lock().map_err(|_| ClientError::StatePoisoned)?;
                let Some(message) = guard.message(chat_id, message_id) else {
                    return Ok(Vec::new());
                };
                let is_group = guard.is_group(chat_id).unwrap_or(false);
                Ok(self.gate.available_actions(
                    &message.sender,
                    self.state.wallet.as_ref(),
                    is_group,
                ))
            }
            ActionTarget::Item { .. } => Ok(if self.state.wallet.is_some() {
                vec![ActionKind::Rename, ActionKind::Share, ActionKind::Download]
            } else {
                Vec::new()
            }),
        }
    }

    /// Run `request` against the open menu's target, then close the menu
    /// unconditionally; the menu never waits for the action's outcome.
    pub fn menu_action(&mut self, request: ActionRequest) -> Result<Uuid> {
        let menu = self.menu.take().ok_or(ClientError::MenuClosed)?;
        self.dispatcher
            .dispatch(request, menu.target, self.state.wallet.as_ref())
    }
}
