//! Analysis pipelines
//!
//! Each execution path is a fixed DAG of stages run by the
//! [`agent_workflow::Executor`] over an [`AnalysisState`].

pub mod stages;
pub mod state;
pub mod topologies;

pub use stages::{ContextPolicy, Side};
pub use state::{
    AnalysisState, EXECUTOR_STAGE, ROUTER_STAGE, RunStatus, Slot, StageFailure, StateUpdate,
};
pub use topologies::TopologySet;
