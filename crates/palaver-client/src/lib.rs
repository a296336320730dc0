//! # palaver-client
//!
//! The headless core of the Palaver chat client: per-conversation
//! subscription ingest, the optimistic action dispatcher, wallet-gated
//! authorization, and the context menu session. An embedding shell
//! constructs a [`ChatClient`] against a backend [`RemoteHandle`] and
//! renders from `snapshot` plus the notification stream.

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod events;
pub mod menu;
pub mod remote;
pub mod state;

mod error;
mod ingest;

pub use client::ChatClient;
pub use config::{ClientConfig, ResubscribePolicy};
pub use dispatcher::{ActionDispatcher, ActionRequest, ActionTarget, PendingAction};
pub use error::{ClientError, Result};
pub use events::ClientNotification;
pub use menu::{ContextMenuSession, OpenMenu};
pub use remote::{remote_channel, RemoteCommand, RemoteHandle};

use tracing_subscriber::{fmt, EnvFilter};

/// Initialise tracing for an embedding shell. Call once at startup;
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("palaver_client=debug,palaver_store=info,warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
