//! Wallet-identity authorization checks.
//!
//! All checks take the connected address as an explicit parameter so they
//! stay pure: no role outlives a disconnect because nothing is cached.

use serde::{Deserialize, Serialize};

use crate::types::{ActionKind, WalletAddress};

/// Navigable surfaces gated on identity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Route {
    Conversations,
    Admin,
}

/// Authorization rules for a single recognized admin address.
///
/// The address is injected at construction so the rule is swappable
/// without touching any check.
#[derive(Debug, Clone)]
pub struct AccessGate {
    admin_address: WalletAddress,
}

impl AccessGate {
    pub fn new(admin_address: WalletAddress) -> Self {
        Self { admin_address }
    }

    /// True iff `address` is connected, non-empty, and byte-for-byte equal
    /// to the configured admin address.
    pub fn is_admin(&self, address: Option<&WalletAddress>) -> bool {
        match address {
            Some(addr) => !addr.is_empty() && *addr == self.admin_address,
            None => false,
        }
    }

    /// True iff the connected address is the sender of the message.
    pub fn is_owner(&self, sender: &WalletAddress, address: Option<&WalletAddress>) -> bool {
        match address {
            Some(addr) => sender == addr,
            None => false,
        }
    }

    /// Moderation actions offered for a message: own message can only be
    /// deleted; another user's message can be reported, and blocked only
    /// outside group conversations. A disconnected wallet gets nothing.
    pub fn available_actions(
        &self,
        sender: &WalletAddress,
        address: Option<&WalletAddress>,
        is_group: bool,
    ) -> Vec<ActionKind> {
        if address.is_none() {
            return Vec::new();
        }
        if self.is_owner(sender, address) {
            vec![ActionKind::Delete]
        } else if is_group {
            vec![ActionKind::Report]
        } else {
            vec![ActionKind::Report, ActionKind::Block]
        }
    }

    /// Whether `address` may navigate to `route`.
    pub fn can_access(&self, route: Route, address: Option<&WalletAddress>) -> bool {
        match route {
            Route::Conversations => true,
            Route::Admin => self.is_admin(address),
        }
    }
}
