//! Client session state owned by the facade.

use std::collections::HashMap;

use palaver_shared::types::{ChatId, WalletAddress};

use crate::ingest::IngestHandle;

/// Wallet session and open subscriptions.
///
/// The connected address is stored here but always passed explicitly into
/// gate and dispatcher calls, so no role can outlive a disconnect.
#[derive(Debug, Default)]
pub struct ClientState {
    /// Currently connected wallet address, if any.
    pub wallet: Option<WalletAddress>,

    /// One active ingest subscription per open conversation.
    pub(crate) subscriptions: HashMap<ChatId, IngestHandle>,
}

impl ClientState {
    pub fn new() -> Self {
        Self::default()
    }
}
