//! Error types for channel operations.

use thiserror::Error;

/// Result type for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;

/// Errors a [`crate::Channel`] implementation can raise.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The channel has never been written, or was cleared by a consume/finish.
    #[error("channel is empty")]
    Empty,

    /// A batch of values violated the channel's update contract (e.g. more than
    /// one value delivered to a single-value channel in one step).
    #[error("invalid update: {0}")]
    InvalidUpdate(String),

    /// Checkpoint (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
