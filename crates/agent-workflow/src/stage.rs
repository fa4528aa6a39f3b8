//! Stage and pipeline state abstractions
//!
//! A stage reads an immutable snapshot of the pipeline state and returns a
//! list of typed updates. The executor applies the updates once the stage
//! completes, so stages never share mutable state.

use agent_core::{ExecContext, Result};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// State threaded through a pipeline run
pub trait WorkflowState: Clone + Send + Sync + 'static {
    /// Typed write produced by a stage
    type Update: Send + 'static;

    /// Apply one update produced by `stage`
    fn apply(&mut self, stage: &str, update: Self::Update);

    /// Record a failure of `stage`
    ///
    /// Called for stage errors, panics, interruptions and skipped stages.
    fn record_error(&mut self, stage: &str, message: &str);
}

/// A unit of work inside a pipeline
///
/// # Example
///
/// ```
/// use agent_core::{ExecContext, Result};
/// use agent_workflow::{Stage, WorkflowState};
/// use async_trait::async_trait;
/// use std::sync::Arc;
///
/// #[derive(Clone, Default)]
/// struct Counter {
///     total: u32,
///     errors: Vec<String>,
/// }
///
/// impl WorkflowState for Counter {
///     type Update = u32;
///
///     fn apply(&mut self, _stage: &str, update: u32) {
///         self.total += update;
///     }
///
///     fn record_error(&mut self, stage: &str, message: &str) {
///         self.errors.push(format!("{stage}: {message}"));
///     }
/// }
///
/// struct AddOne;
///
/// #[async_trait]
/// impl Stage<Counter> for AddOne {
///     async fn run(&self, _state: Arc<Counter>, _ctx: &ExecContext) -> Result<Vec<u32>> {
///         Ok(vec![1])
///     }
/// }
/// ```
#[async_trait]
pub trait Stage<S: WorkflowState>: Send + Sync {
    /// Run the stage against a snapshot of the state
    async fn run(&self, state: Arc<S>, ctx: &ExecContext) -> Result<Vec<S::Update>>;
}

/// Stage backed by an async closure
pub struct FnStage<F> {
    func: F,
}

impl<F> FnStage<F> {
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<S, F, Fut> Stage<S> for FnStage<F>
where
    S: WorkflowState,
    F: Fn(Arc<S>, ExecContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<S::Update>>> + Send,
{
    async fn run(&self, state: Arc<S>, ctx: &ExecContext) -> Result<Vec<S::Update>> {
        (self.func)(state, ctx.clone()).await
    }
}
