//! Error types for agent-core

use thiserror::Error;

/// Result type alias for agent-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for agent operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Agent initialization failed
    #[error("Agent initialization failed: {0}")]
    InitializationFailed(String),

    /// Agent processing failed
    #[error("Agent processing failed: {0}")]
    ProcessingFailed(String),

    /// The surrounding run was cancelled
    #[error("Cancelled")]
    Cancelled,

    /// The run deadline elapsed before the work finished
    #[error("Deadline exceeded")]
    DeadlineExceeded,
}

impl Error {
    /// Whether this error comes from cancellation or an elapsed deadline
    /// rather than from the work itself
    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}
