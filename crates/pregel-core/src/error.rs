//! Error types for task identity, write application and superstep planning.

use pregel_channels::ChannelError;
use thiserror::Error;

/// Result type used throughout the engine.
pub type Result<T> = std::result::Result<T, PregelError>;

/// Errors raised while applying writes or preparing the next superstep.
#[derive(Error, Debug)]
pub enum PregelError {
    /// A task produced a [`crate::send::Send`] whose target node isn't
    /// registered, or otherwise malformed the write it handed to `local_write`.
    #[error("invalid update: {0}")]
    InvalidUpdate(String),

    /// A task (or the planner, during `_proc_input`) read a channel that has
    /// never been written and isn't a trigger it's allowed to skip.
    #[error("channel is empty")]
    EmptyChannel,

    /// A replayed task's recomputed identity didn't match the checksum it was
    /// replayed with. This can only mean the process graph changed between
    /// the checkpoint being written and being replayed — it is never safe to
    /// ignore.
    #[error("task id checksum mismatch: expected {expected}, computed {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// A channel operation failed.
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// Checkpoint (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
