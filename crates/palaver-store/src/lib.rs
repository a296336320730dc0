//! # palaver-store
//!
//! The authoritative in-memory view of conversation state: ordered,
//! deduplicated per-conversation message sequences, their reactions, and
//! the shared-item registry.
//!
//! The store is fed from two sides, subscription ingest and optimistic
//! dispatcher mutations. All operations are keyed by id and idempotent, so
//! concurrent application from either source converges to the same state
//! regardless of interleaving.

pub mod conversations;
pub mod items;
pub mod models;
pub mod store;

mod error;

pub use error::{Result, StoreError};
pub use models::{Conversation, Message, SharedItem};
pub use store::ConversationStore;
