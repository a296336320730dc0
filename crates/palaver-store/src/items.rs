//! Shared-item registry operations.
//!
//! Items are created externally and only mutated through rename; the
//! dispatcher validates names before they reach the store.

use tracing::debug;

use palaver_shared::types::ItemId;

use crate::models::SharedItem;
use crate::store::ConversationStore;

impl ConversationStore {
    /// Register a shared item, replacing any prior entry with the same id.
    pub fn insert_item(&mut self, item: SharedItem) {
        debug!(item = %item.id, name = %item.name, "Registering shared item");
        self.items.insert(item.id, item);
    }

    /// Owned copy of one item, if known.
    pub fn item(&self, id: &ItemId) -> Option<SharedItem> {
        self.items.get(id).cloned()
    }

    /// Rename an item, returning the previous name, or `None` when the id
    /// is unknown.
    pub fn rename_item(&mut self, id: &ItemId, name: &str) -> Option<String> {
        let item = self.items.get_mut(id)?;
        let previous = std::mem::replace(&mut item.name, name.to_string());
        debug!(item = %id, from = %previous, to = %name, "Renamed shared item");
        Some(previous)
    }

    /// Remove an item; absent ids are a no-op.
    pub fn remove_item(&mut self, id: &ItemId) -> bool {
        self.items.remove(id).is_some()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}
