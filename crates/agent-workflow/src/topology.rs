//! Pipeline topology definition
//!
//! A [`Topology`] is an immutable, validated DAG of named stages. It is
//! built once through [`PipelineBuilder`] and then shared read-only between
//! runs, usually behind an `Arc`.

use crate::error::{Result, WorkflowError};
use crate::stage::{FnStage, Stage, WorkflowState};
use agent_core::ExecContext;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A compiled stage with its resolved edges
pub(crate) struct StageNode<S: WorkflowState> {
    pub(crate) name: String,
    pub(crate) stage: Arc<dyn Stage<S>>,
    pub(crate) predecessors: Vec<usize>,
    pub(crate) successors: Vec<usize>,
}

/// Immutable DAG of stages
pub struct Topology<S: WorkflowState> {
    name: String,
    pub(crate) nodes: Vec<StageNode<S>>,
    pub(crate) entries: Vec<usize>,
    order: Vec<usize>,
}

impl<S: WorkflowState> Topology<S> {
    /// Create a new pipeline builder
    ///
    /// # Arguments
    ///
    /// * `name` - Pipeline name, used in logs and errors
    pub fn builder(name: impl Into<String>) -> PipelineBuilder<S> {
        PipelineBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of stages
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false for a compiled topology
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, stage: &str) -> bool {
        self.nodes.iter().any(|node| node.name == stage)
    }

    /// Stages without predecessors, in registration order
    pub fn entries(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|&idx| self.nodes[idx].name.as_str())
            .collect()
    }

    /// Stage names in a valid topological order
    pub fn order(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(|&idx| self.nodes[idx].name.as_str())
            .collect()
    }

    /// Direct predecessors of `stage`, `None` when the stage is unknown
    pub fn predecessors(&self, stage: &str) -> Option<Vec<&str>> {
        self.index_of(stage).map(|idx| {
            self.nodes[idx]
                .predecessors
                .iter()
                .map(|&p| self.nodes[p].name.as_str())
                .collect()
        })
    }

    /// Direct successors of `stage`, `None` when the stage is unknown
    pub fn successors(&self, stage: &str) -> Option<Vec<&str>> {
        self.index_of(stage).map(|idx| {
            self.nodes[idx]
                .successors
                .iter()
                .map(|&s| self.nodes[s].name.as_str())
                .collect()
        })
    }

    /// All edges as `(from, to)` pairs
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.nodes
            .iter()
            .flat_map(|node| {
                node.successors
                    .iter()
                    .map(move |&s| (node.name.as_str(), self.nodes[s].name.as_str()))
            })
            .collect()
    }

    fn index_of(&self, stage: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.name == stage)
    }
}

impl<S: WorkflowState> fmt::Debug for Topology<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Topology")
            .field("name", &self.name)
            .field("order", &self.order())
            .field("edges", &self.edges())
            .finish()
    }
}

/// Builder for constructing pipeline topologies
///
/// Registration and edges are recorded as given; all validation happens in
/// [`PipelineBuilder::compile`].
///
/// # Example
///
/// ```
/// use agent_workflow::{PipelineBuilder, WorkflowState};
///
/// #[derive(Clone, Default)]
/// struct Notes(Vec<String>);
///
/// impl WorkflowState for Notes {
///     type Update = String;
///     fn apply(&mut self, _stage: &str, update: String) {
///         self.0.push(update);
///     }
///     fn record_error(&mut self, stage: &str, message: &str) {
///         self.0.push(format!("{stage} failed: {message}"));
///     }
/// }
///
/// let topology = PipelineBuilder::<Notes>::new("demo")
///     .register_stage_fn("fetch", |_state, _ctx| async { Ok(vec!["fetched".to_string()]) })
///     .register_stage_fn("report", |_state, _ctx| async { Ok(vec!["reported".to_string()]) })
///     .add_edge("fetch", "report")
///     .compile()
///     .unwrap();
///
/// assert_eq!(topology.entries(), vec!["fetch"]);
/// assert_eq!(topology.order(), vec!["fetch", "report"]);
/// ```
pub struct PipelineBuilder<S: WorkflowState> {
    name: String,
    stages: Vec<(String, Arc<dyn Stage<S>>)>,
    edges: Vec<(String, String)>,
}

impl<S: WorkflowState> PipelineBuilder<S> {
    /// Create a new pipeline builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Register a stage under a unique name
    ///
    /// # Arguments
    ///
    /// * `name` - Stage name, must be unique within the pipeline
    /// * `stage` - The stage implementation
    pub fn register_stage(self, name: impl Into<String>, stage: impl Stage<S> + 'static) -> Self {
        self.register_shared(name, Arc::new(stage))
    }

    /// Register an already shared stage
    pub fn register_shared(mut self, name: impl Into<String>, stage: Arc<dyn Stage<S>>) -> Self {
        self.stages.push((name.into(), stage));
        self
    }

    /// Register an async closure as a stage
    pub fn register_stage_fn<F, Fut>(self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Arc<S>, ExecContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = agent_core::Result<Vec<S::Update>>> + Send + 'static,
    {
        self.register_stage(name, FnStage::new(func))
    }

    /// Add a dependency edge: `to` runs only after `from` has finished
    ///
    /// Repeated edges are collapsed.
    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        let edge = (from.into(), to.into());
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
        self
    }

    /// Validate the graph and freeze it into a [`Topology`]
    pub fn compile(self) -> Result<Topology<S>> {
        if self.stages.is_empty() {
            return Err(WorkflowError::Empty(self.name));
        }

        let mut index: HashMap<&str, usize> = HashMap::with_capacity(self.stages.len());
        for (idx, (name, _)) in self.stages.iter().enumerate() {
            if index.insert(name.as_str(), idx).is_some() {
                return Err(WorkflowError::DuplicateStage(name.clone()));
            }
        }

        let mut predecessors = vec![Vec::new(); self.stages.len()];
        let mut successors = vec![Vec::new(); self.stages.len()];
        for (from, to) in &self.edges {
            let resolve = |name: &String| {
                index
                    .get(name.as_str())
                    .copied()
                    .ok_or_else(|| WorkflowError::UnknownStage {
                        from: from.clone(),
                        to: to.clone(),
                        missing: name.clone(),
                    })
            };
            let from_idx = resolve(from)?;
            let to_idx = resolve(to)?;
            if from_idx == to_idx {
                return Err(WorkflowError::SelfLoop(from.clone()));
            }
            successors[from_idx].push(to_idx);
            predecessors[to_idx].push(from_idx);
        }

        // Kahn's algorithm, seeded in registration order
        let mut in_degree: Vec<usize> = predecessors.iter().map(Vec::len).collect();
        let entries: Vec<usize> = (0..self.stages.len())
            .filter(|&idx| in_degree[idx] == 0)
            .collect();
        let mut queue: VecDeque<usize> = entries.iter().copied().collect();
        let mut order = Vec::with_capacity(self.stages.len());
        while let Some(idx) = queue.pop_front() {
            order.push(idx);
            for &next in &successors[idx] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        if order.len() < self.stages.len() {
            let visited: HashSet<usize> = order.iter().copied().collect();
            let stuck = (0..self.stages.len())
                .filter(|idx| !visited.contains(idx))
                .map(|idx| self.stages[idx].0.clone())
                .collect();
            return Err(WorkflowError::Cycle(stuck));
        }

        let nodes = self
            .stages
            .into_iter()
            .zip(predecessors.into_iter().zip(successors))
            .map(|((name, stage), (predecessors, successors))| StageNode {
                name,
                stage,
                predecessors,
                successors,
            })
            .collect();

        Ok(Topology {
            name: self.name,
            nodes,
            entries,
            order,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Log(Vec<String>);

    impl WorkflowState for Log {
        type Update = String;

        fn apply(&mut self, _stage: &str, update: String) {
            self.0.push(update);
        }

        fn record_error(&mut self, stage: &str, message: &str) {
            self.0.push(format!("{stage}: {message}"));
        }
    }

    fn noop(builder: PipelineBuilder<Log>, name: &str) -> PipelineBuilder<Log> {
        builder.register_stage_fn(name, |_state, _ctx| async { Ok(Vec::new()) })
    }

    fn diamond() -> PipelineBuilder<Log> {
        let builder = PipelineBuilder::new("diamond");
        let builder = ["collect", "left", "right", "join"]
            .into_iter()
            .fold(builder, noop);
        builder
            .add_edge("collect", "left")
            .add_edge("collect", "right")
            .add_edge("left", "join")
            .add_edge("right", "join")
    }

    #[test]
    fn test_compile_diamond() {
        let topology = diamond().compile().unwrap();

        assert_eq!(topology.name(), "diamond");
        assert_eq!(topology.len(), 4);
        assert_eq!(topology.entries(), vec!["collect"]);
        assert_eq!(topology.order(), vec!["collect", "left", "right", "join"]);
        assert_eq!(topology.predecessors("join"), Some(vec!["left", "right"]));
        assert_eq!(topology.successors("collect"), Some(vec!["left", "right"]));
        assert_eq!(topology.predecessors("missing"), None);
        assert!(topology.contains("left"));
        assert!(!topology.contains("risk"));
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let topology = diamond()
            .add_edge("collect", "left")
            .add_edge("left", "join")
            .compile()
            .unwrap();
        assert_eq!(topology.edges().len(), 4);
    }

    #[test]
    fn test_empty_pipeline() {
        let err = PipelineBuilder::<Log>::new("nothing").compile().unwrap_err();
        assert_eq!(err, WorkflowError::Empty("nothing".to_string()));
    }

    #[test]
    fn test_duplicate_stage() {
        let builder = noop(noop(PipelineBuilder::new("dup"), "a"), "a");
        let err = builder.compile().unwrap_err();
        assert_eq!(err, WorkflowError::DuplicateStage("a".to_string()));
    }

    #[test]
    fn test_unknown_stage() {
        let err = noop(PipelineBuilder::new("unknown"), "a")
            .add_edge("a", "b")
            .compile()
            .unwrap_err();
        assert_eq!(
            err,
            WorkflowError::UnknownStage {
                from: "a".to_string(),
                to: "b".to_string(),
                missing: "b".to_string(),
            }
        );
    }

    #[test]
    fn test_self_loop() {
        let err = noop(PipelineBuilder::new("loop"), "a")
            .add_edge("a", "a")
            .compile()
            .unwrap_err();
        assert_eq!(err, WorkflowError::SelfLoop("a".to_string()));
    }

    #[test]
    fn test_cycle() {
        let builder = ["a", "b", "c"]
            .into_iter()
            .fold(PipelineBuilder::new("cycle"), noop);
        let err = builder
            .add_edge("a", "b")
            .add_edge("b", "c")
            .add_edge("c", "b")
            .compile()
            .unwrap_err();
        assert_eq!(
            err,
            WorkflowError::Cycle(vec!["b".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn test_independent_stages_are_all_entries() {
        let builder = ["x", "y", "z"]
            .into_iter()
            .fold(PipelineBuilder::new("flat"), noop);
        let topology = builder.compile().unwrap();
        assert_eq!(topology.entries(), vec!["x", "y", "z"]);
        assert!(topology.edges().is_empty());
    }
}
