use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pre-mutation rejections. Both are detected before any local or remote
/// state changes, so they never need a rollback.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActionError {
    #[error("action not permitted for this actor and target")]
    Forbidden,

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Failures of the remote write/subscribe contract. These surface after an
/// optimistic mutation may already have been applied, so the dispatcher
/// rolls back on any of them.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RemoteError {
    /// The backend rejected the write.
    #[error("backend rejected the request: {0}")]
    Rejected(String),

    /// The backend did not answer in time. Timeout tracking is the
    /// backend's responsibility; to the client this is just a failure.
    #[error("remote request timed out")]
    Timeout,

    /// The command channel or the reply channel closed before an answer
    /// arrived.
    #[error("remote channel closed")]
    ChannelClosed,
}
