//! Error types for nexus-agent

use thiserror::Error;

use crate::checkpoint::CheckpointError;
use crate::config::ConfigError;

/// Result type alias using nexus-agent Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can end an orchestrator operation
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid injected configuration, raised before any loop runs
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The reasoning capability failed; the last checkpoint is unchanged
    #[error("Provider error: {0}")]
    Provider(#[from] nexus_ai::Error),

    /// A checkpoint write or read failed; the pending state was not committed
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    /// A new turn was started while tool calls still await a human decision
    #[error("Thread '{thread_id}' has tool calls awaiting approval")]
    ApprovalPending { thread_id: String },

    /// An approval decision arrived for a thread that is not waiting for one
    #[error("Thread '{thread_id}' has no tool calls awaiting approval")]
    NoPendingApproval { thread_id: String },
}

impl Error {
    /// Whether the session can be resumed from its last checkpoint as-is
    pub fn is_resumable(&self) -> bool {
        !matches!(self, Error::Config(_))
    }
}
