//! Pipeline executor
//!
//! The executor walks a [`Topology`] in dataflow order:
//! 1. Launch every entry stage
//! 2. When a stage completes, apply its updates (or record its failure)
//! 3. Launch each successor whose predecessors have all completed
//! 4. Stop once every stage has completed or been skipped
//!
//! Running stages are polled concurrently on the caller's task. A failing,
//! panicking or interrupted stage never aborts the run; it is recorded in the
//! state and its successors still run.

use crate::error::Result;
use crate::stage::WorkflowState;
use crate::topology::{StageNode, Topology};
use agent_core::ExecContext;
use futures::FutureExt;
use futures::stream::{FuturesUnordered, StreamExt};
use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Configuration for pipeline execution
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    /// Upper bound for a single stage, on top of the run deadline
    pub stage_timeout: Option<Duration>,
}

impl ExecutorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap every stage at `timeout`
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = Some(timeout);
        self
    }
}

/// Runs compiled topologies
#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: ExecutorConfig,
}

type StageOutcome<U> = std::result::Result<Vec<U>, String>;

impl Executor {
    /// Create a new executor
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute `topology` starting from `initial`
    ///
    /// # Arguments
    ///
    /// * `topology` - The compiled pipeline
    /// * `initial` - Initial pipeline state
    /// * `ctx` - Cancellation and deadline for the whole run
    ///
    /// # Returns
    ///
    /// The final state, with every stage failure recorded through
    /// [`WorkflowState::record_error`]. Fails only when `ctx` is already
    /// cancelled or expired before the first stage starts.
    pub async fn run<S: WorkflowState>(
        &self,
        topology: &Topology<S>,
        initial: S,
        ctx: &ExecContext,
    ) -> Result<S> {
        ctx.check()?;

        let started = Instant::now();
        info!(
            "Running pipeline '{}' ({} stages)",
            topology.name(),
            topology.len()
        );

        let mut state = Arc::new(initial);
        let mut waiting_on: Vec<usize> = topology
            .nodes
            .iter()
            .map(|node| node.predecessors.len())
            .collect();
        let mut ready: VecDeque<usize> = topology.entries.iter().copied().collect();
        let mut running = FuturesUnordered::new();
        let mut completed = 0;

        while completed < topology.len() {
            while let Some(idx) = ready.pop_front() {
                let node = &topology.nodes[idx];
                if let Err(reason) = ctx.check() {
                    warn!("Skipping stage '{}': {}", node.name, reason);
                    Arc::make_mut(&mut state)
                        .record_error(&node.name, &format!("skipped: {reason}"));
                    completed += 1;
                    release(node, &mut waiting_on, &mut ready);
                    continue;
                }

                debug!("Launching stage '{}'", node.name);
                running.push(run_stage(
                    idx,
                    node,
                    Arc::clone(&state),
                    ctx,
                    self.config.stage_timeout,
                ));
            }

            let Some((idx, outcome)) = running.next().await else {
                break;
            };
            completed += 1;

            let node = &topology.nodes[idx];
            let target = Arc::make_mut(&mut state);
            match outcome {
                Ok(updates) => {
                    debug!("Stage '{}' produced {} updates", node.name, updates.len());
                    for update in updates {
                        target.apply(&node.name, update);
                    }
                }
                Err(message) => {
                    warn!("Stage '{}' failed: {}", node.name, message);
                    target.record_error(&node.name, &message);
                }
            }
            release(node, &mut waiting_on, &mut ready);
        }

        info!(
            "Pipeline '{}' finished in {:?}",
            topology.name(),
            started.elapsed()
        );

        Ok(Arc::try_unwrap(state).unwrap_or_else(|shared| (*shared).clone()))
    }
}

/// Mark `node` as done and queue successors that became ready
fn release<S: WorkflowState>(
    node: &StageNode<S>,
    waiting_on: &mut [usize],
    ready: &mut VecDeque<usize>,
) {
    for &next in &node.successors {
        waiting_on[next] -= 1;
        if waiting_on[next] == 0 {
            ready.push_back(next);
        }
    }
}

async fn run_stage<S: WorkflowState>(
    idx: usize,
    node: &StageNode<S>,
    snapshot: Arc<S>,
    ctx: &ExecContext,
    stage_timeout: Option<Duration>,
) -> (usize, StageOutcome<S::Update>) {
    let stage_ctx = match stage_timeout {
        Some(timeout) => ctx.child_with_timeout(timeout),
        None => ctx.child(),
    };

    let started = Instant::now();
    let guarded = AssertUnwindSafe(node.stage.run(snapshot, &stage_ctx)).catch_unwind();
    let outcome = match stage_ctx.run(guarded).await {
        Ok(Ok(Ok(updates))) => Ok(updates),
        Ok(Ok(Err(err))) => Err(err.to_string()),
        Ok(Err(payload)) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
        Err(interrupted) => Err(interrupted.to_string()),
    };
    debug!("Stage '{}' completed in {:?}", node.name, started.elapsed());

    (idx, outcome)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
