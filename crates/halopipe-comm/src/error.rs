//! Error types for halopipe-comm
//!
//! Every communication failure is fatal for the whole worker group.
//! There is no retry path: a worker that sees one of these errors
//! stops and, if it is the originator, aborts its peers.

use thiserror::Error;

/// Errors that can occur while partitioning or moving data between workers
#[derive(Debug, Error)]
pub enum CommError {
    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] halopipe_core::Error),

    /// Group or partition parameters are unusable
    #[error("invalid group configuration: {0}")]
    InvalidGroup(String),

    /// A distribution plan does not fit the buffer or the group
    #[error("invalid distribution plan: {0}")]
    InvalidPlan(String),

    /// A received or supplied buffer has the wrong length
    #[error("length mismatch on rank {rank}: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        rank: usize,
        expected: usize,
        actual: usize,
    },

    /// A coordinator-only argument was supplied by a worker, or missing on the coordinator
    #[error("rank {rank}: {message}")]
    RoleMismatch { rank: usize, message: &'static str },

    /// Another member aborted the group
    #[error("group aborted by rank {by}: {reason}")]
    Aborted { by: usize, reason: String },

    /// A peer went away without aborting
    #[error("rank {peer} disconnected")]
    Disconnected { peer: usize },
}

/// Result type for communication operations
pub type CommResult<T> = Result<T, CommError>;
