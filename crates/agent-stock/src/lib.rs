//! Stock analysis orchestration
//!
//! This crate turns a classified user intent into a finished analysis:
//!
//! - Intent routing to one of five execution paths (fast, single aspect,
//!   standard, comparison, deep dive)
//! - Analysis pipelines built once as immutable stage graphs and run by
//!   `agent-workflow` with per-stage failure isolation
//! - Weighted score synthesis with signal conflict detection
//! - Rule-based portfolio decisions and portfolio-wide aggregation
//!
//! Market data and the analysis producers themselves (usually LLM-backed)
//! are collaborators behind the [`DataSource`], [`AnalysisProducer`] and
//! [`ComparisonProducer`] traits.
//!
//! # Architecture
//!
//! ```text
//! Intent -> IntentRouter -> TopologySet -> Executor -> AnalysisState
//!                                 |
//!           collect data -> producers (concurrent) -> risk -> synthesize
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use agent_core::ExecContext;
//! use agent_stock::{Intent, IntentKind, StockConfig, StockOrchestrator};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let orchestrator = StockOrchestrator::new(
//!         Arc::new(/* your data source */),
//!         /* your producers */,
//!         StockConfig::from_env()?,
//!     )?;
//!
//!     let intent = Intent::certain(IntentKind::FullAnalysis, ["TCS"]);
//!     let state = orchestrator.run(&intent, &ExecContext::new()).await;
//!     println!("{:?}: {:?}", state.status(), state.recommendation());
//!
//!     Ok(())
//! }
//! ```

pub mod agents;
pub mod config;
pub mod data;
pub mod error;
pub mod intent;
pub mod orchestrator;
pub mod pipeline;
pub mod portfolio;
pub mod router;
pub mod synthesis;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use agents::{
    AnalysisKind, AnalysisProducer, AnalysisReport, ComparisonProducer, InputBundle, ProducerSet,
};
pub use config::StockConfig;
pub use data::DataSource;
pub use error::{Result, StockError};
pub use intent::{Intent, IntentKind};
pub use orchestrator::StockOrchestrator;
pub use pipeline::{AnalysisState, RunStatus};
pub use portfolio::{Holding, PortfolioAnalyzer, PortfolioReport};
pub use router::{ExecutionPath, IntentRouter, RouteError};
pub use synthesis::{Horizon, WeightedScoreResult, synthesize};
