//! Pipeline orchestration for agent-rs
//!
//! This crate runs DAGs of async stages over a shared, typed state:
//! fan-out to concurrent siblings, barrier joins, and per-stage failure
//! isolation under a deadline and cancellation context.

pub mod error;
pub mod executor;
pub mod stage;
pub mod topology;

// Re-export for convenience
pub use error::WorkflowError;
pub use executor::{Executor, ExecutorConfig};
pub use stage::{FnStage, Stage, WorkflowState};
pub use topology::{PipelineBuilder, Topology};
