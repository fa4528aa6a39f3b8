//! Stock analysis orchestrator
//!
//! Routes an intent, runs the matching topology and returns the final
//! [`AnalysisState`]. A run never fails as a whole: rejections, stage
//! failures and interruptions all end up in the state's error list.

use crate::agents::ProducerSet;
use crate::config::StockConfig;
use crate::data::DataSource;
use crate::error::Result;
use crate::intent::Intent;
use crate::pipeline::{AnalysisState, EXECUTOR_STAGE, TopologySet};
use crate::router::{ExecutionPath, IntentRouter, Route, RouteError};
use agent_core::ExecContext;
use agent_workflow::{Executor, ExecutorConfig, Topology, WorkflowState};
use std::sync::Arc;
use tracing::{info, warn};

/// Router, executor and prebuilt topologies behind one entry point
pub struct StockOrchestrator {
    router: IntentRouter,
    executor: Executor,
    topologies: TopologySet,
    config: StockConfig,
}

impl StockOrchestrator {
    /// Create a new orchestrator
    ///
    /// # Arguments
    ///
    /// * `source` - Market data provider shared by every run
    /// * `producers` - Analysis producers, one per report kind
    /// * `config` - Stock configuration
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid, a producer sits in the wrong
    /// slot, or a topology does not compile.
    pub fn new(
        source: Arc<dyn DataSource>,
        producers: ProducerSet,
        config: StockConfig,
    ) -> Result<Self> {
        config.validate()?;
        producers.validate()?;

        let topologies = TopologySet::build(&source, &producers, config.historical_days)?;
        let executor = Executor::new(match config.stage_timeout {
            Some(timeout) => ExecutorConfig::new().with_stage_timeout(timeout),
            None => ExecutorConfig::new(),
        });

        info!(
            "Stock orchestrator ready (horizon: {}, stage timeout: {:?})",
            config.time_horizon, config.stage_timeout
        );

        Ok(Self {
            router: IntentRouter::new(),
            executor,
            topologies,
            config,
        })
    }

    pub fn config(&self) -> &StockConfig {
        &self.config
    }

    pub fn topology(&self, path: ExecutionPath) -> &Topology<AnalysisState> {
        self.topologies.get(path)
    }

    /// Route without running, e.g. to show the progress message up front
    pub fn route(&self, intent: &Intent) -> std::result::Result<Route, RouteError> {
        self.router.route(intent)
    }

    /// Run the pipeline for `intent`
    ///
    /// When `ctx` has no deadline, the path's run budget becomes one.
    pub async fn run(&self, intent: &Intent, ctx: &ExecContext) -> AnalysisState {
        let route = match self.router.route(intent) {
            Ok(route) => route,
            Err(err) => {
                warn!("Rejected {} intent: {}", intent.kind(), err);
                return AnalysisState::rejected(intent, err.to_string());
            }
        };

        let run_ctx = if ctx.deadline().is_some() {
            ctx.clone()
        } else {
            ctx.clone()
                .with_timeout(self.config.run_budget(route.path))
        };

        let initial = AnalysisState::new(intent, route.path, self.config.time_horizon.as_str());
        info!(
            "Run {}: {} for {:?} on {} path",
            initial.run_id(),
            intent.kind(),
            intent.tickers(),
            route.path
        );

        let topology = self.topologies.get(route.path);
        let mut state = match self.executor.run(topology, initial.clone(), &run_ctx).await {
            Ok(state) => state,
            Err(err) => {
                warn!("Run {} did not start: {}", initial.run_id(), err);
                let mut state = initial;
                state.record_error(EXECUTOR_STAGE, &err.to_string());
                state
            }
        };
        state.finish();

        info!(
            "Run {} finished: {:?} ({} errors)",
            state.run_id(),
            state.status(),
            state.errors().len()
        );
        state
    }
}
