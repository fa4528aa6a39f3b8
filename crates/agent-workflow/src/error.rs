//! Error types for agent-workflow

use thiserror::Error;

/// Errors raised while compiling or running a pipeline
///
/// Stage failures never show up here: they are recorded in the pipeline
/// state and the run carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// The pipeline has no stages
    #[error("Pipeline '{0}' has no stages")]
    Empty(String),

    /// A stage name was registered twice
    #[error("Stage '{0}' registered more than once")]
    DuplicateStage(String),

    /// An edge references a stage that was never registered
    #[error("Edge {from} -> {to} references unknown stage '{missing}'")]
    UnknownStage {
        from: String,
        to: String,
        missing: String,
    },

    /// An edge points from a stage to itself
    #[error("Stage '{0}' depends on itself")]
    SelfLoop(String),

    /// The edges form a cycle through the listed stages
    #[error("Cycle detected between stages: {}", .0.join(", "))]
    Cycle(Vec<String>),

    /// The run was cancelled or out of time before any stage started
    #[error("Run interrupted before start: {0}")]
    Interrupted(#[from] agent_core::Error),
}

/// Result type alias for agent-workflow
pub type Result<T> = std::result::Result<T, WorkflowError>;

impl From<WorkflowError> for agent_core::Error {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Interrupted(inner) => inner,
            other => agent_core::Error::InitializationFailed(other.to_string()),
        }
    }
}
