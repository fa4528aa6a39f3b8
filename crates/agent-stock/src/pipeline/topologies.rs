//! Stage graphs for each execution path
//!
//! ```text
//! fast:       collect_price
//! single:     collect_data -> single_producer
//! standard:   collect_all -> {fundamental, technical, sentiment}
//!             {fundamental, technical} -> risk
//!             {fundamental, technical, sentiment, risk} -> synthesize
//! deep_dive:  same graph as standard, detail mode on
//! comparison: collect_primary -> {fundamental_primary, technical_primary}
//!             collect_secondary -> {fundamental_secondary, technical_secondary}
//!             all four -> compare
//! ```

use super::stages::{
    Analyze, AnalyzeAspect, CollectData, CollectPrice, CollectStock, Compare, ContextPolicy,
    Side, Synthesize,
};
use super::state::AnalysisState;
use crate::agents::ProducerSet;
use crate::data::DataSource;
use crate::error::Result;
use crate::router::ExecutionPath;
use agent_workflow::Topology;
use std::sync::Arc;

pub const COLLECT_PRICE: &str = "collect_price";
pub const COLLECT_DATA: &str = "collect_data";
pub const SINGLE_PRODUCER: &str = "single_producer";
pub const COLLECT_ALL: &str = "collect_all";
pub const FUNDAMENTAL: &str = "fundamental";
pub const TECHNICAL: &str = "technical";
pub const SENTIMENT: &str = "sentiment";
pub const RISK: &str = "risk";
pub const SYNTHESIZE: &str = "synthesize";
pub const COLLECT_PRIMARY: &str = "collect_primary";
pub const COLLECT_SECONDARY: &str = "collect_secondary";
pub const FUNDAMENTAL_PRIMARY: &str = "fundamental_primary";
pub const TECHNICAL_PRIMARY: &str = "technical_primary";
pub const FUNDAMENTAL_SECONDARY: &str = "fundamental_secondary";
pub const TECHNICAL_SECONDARY: &str = "technical_secondary";
pub const COMPARE: &str = "compare";

type Graph = Arc<Topology<AnalysisState>>;

/// Compiled topologies, one per execution path
///
/// Built once per orchestrator and shared by every run.
#[derive(Debug, Clone)]
pub struct TopologySet {
    fast: Graph,
    single: Graph,
    standard: Graph,
    comparison: Graph,
    deep_dive: Graph,
}

impl TopologySet {
    /// Wire the stages of every path to the given collaborators
    pub fn build(
        source: &Arc<dyn DataSource>,
        producers: &ProducerSet,
        historical_days: u32,
    ) -> Result<Self> {
        Ok(Self {
            fast: Arc::new(fast(source)?),
            single: Arc::new(single(source, producers, historical_days)?),
            standard: Arc::new(standard("standard", source, producers, historical_days)?),
            comparison: Arc::new(comparison(source, producers, historical_days)?),
            deep_dive: Arc::new(standard("deep_dive", source, producers, historical_days)?),
        })
    }

    pub fn get(&self, path: ExecutionPath) -> &Graph {
        match path {
            ExecutionPath::Fast => &self.fast,
            ExecutionPath::Single => &self.single,
            ExecutionPath::Standard => &self.standard,
            ExecutionPath::Comparison => &self.comparison,
            ExecutionPath::DeepDive => &self.deep_dive,
        }
    }
}

fn fast(source: &Arc<dyn DataSource>) -> Result<Topology<AnalysisState>> {
    Ok(Topology::builder("fast")
        .register_stage(COLLECT_PRICE, CollectPrice::new(Arc::clone(source)))
        .compile()?)
}

fn single(
    source: &Arc<dyn DataSource>,
    producers: &ProducerSet,
    historical_days: u32,
) -> Result<Topology<AnalysisState>> {
    let aspect = AnalyzeAspect::new(
        Analyze::new(Arc::clone(&producers.technical), Side::Primary)?,
        Analyze::new(Arc::clone(&producers.fundamental), Side::Primary)?,
        Analyze::new(Arc::clone(&producers.sentiment), Side::Primary)?,
    );

    Ok(Topology::builder("single")
        .register_stage(
            COLLECT_DATA,
            CollectData::new(
                Arc::clone(source),
                historical_days,
                ContextPolicy::SentimentOnly,
            ),
        )
        .register_stage(SINGLE_PRODUCER, aspect)
        .add_edge(COLLECT_DATA, SINGLE_PRODUCER)
        .compile()?)
}

fn standard(
    name: &str,
    source: &Arc<dyn DataSource>,
    producers: &ProducerSet,
    historical_days: u32,
) -> Result<Topology<AnalysisState>> {
    let analyze = |producer| Analyze::new(Arc::clone(producer), Side::Primary);

    Ok(Topology::builder(name)
        .register_stage(
            COLLECT_ALL,
            CollectData::new(Arc::clone(source), historical_days, ContextPolicy::Always),
        )
        .register_stage(FUNDAMENTAL, analyze(&producers.fundamental)?)
        .register_stage(TECHNICAL, analyze(&producers.technical)?)
        .register_stage(SENTIMENT, analyze(&producers.sentiment)?)
        .register_stage(RISK, analyze(&producers.risk)?)
        .register_stage(SYNTHESIZE, Synthesize::new(Arc::clone(&producers.synthesis)))
        .add_edge(COLLECT_ALL, FUNDAMENTAL)
        .add_edge(COLLECT_ALL, TECHNICAL)
        .add_edge(COLLECT_ALL, SENTIMENT)
        .add_edge(FUNDAMENTAL, RISK)
        .add_edge(TECHNICAL, RISK)
        .add_edge(SENTIMENT, RISK)
        .add_edge(FUNDAMENTAL, SYNTHESIZE)
        .add_edge(TECHNICAL, SYNTHESIZE)
        .add_edge(SENTIMENT, SYNTHESIZE)
        .add_edge(RISK, SYNTHESIZE)
        .compile()?)
}

fn comparison(
    source: &Arc<dyn DataSource>,
    producers: &ProducerSet,
    historical_days: u32,
) -> Result<Topology<AnalysisState>> {
    let collect = |side| CollectStock::new(Arc::clone(source), historical_days, side);

    Ok(Topology::builder("comparison")
        .register_stage(COLLECT_PRIMARY, collect(Side::Primary))
        .register_stage(COLLECT_SECONDARY, collect(Side::Secondary))
        .register_stage(
            FUNDAMENTAL_PRIMARY,
            Analyze::new(Arc::clone(&producers.fundamental), Side::Primary)?,
        )
        .register_stage(
            TECHNICAL_PRIMARY,
            Analyze::new(Arc::clone(&producers.technical), Side::Primary)?,
        )
        .register_stage(
            FUNDAMENTAL_SECONDARY,
            Analyze::new(Arc::clone(&producers.fundamental), Side::Secondary)?,
        )
        .register_stage(
            TECHNICAL_SECONDARY,
            Analyze::new(Arc::clone(&producers.technical), Side::Secondary)?,
        )
        .register_stage(COMPARE, Compare::new(Arc::clone(&producers.comparison)))
        .add_edge(COLLECT_PRIMARY, FUNDAMENTAL_PRIMARY)
        .add_edge(COLLECT_PRIMARY, TECHNICAL_PRIMARY)
        .add_edge(COLLECT_SECONDARY, FUNDAMENTAL_SECONDARY)
        .add_edge(COLLECT_SECONDARY, TECHNICAL_SECONDARY)
        .add_edge(FUNDAMENTAL_PRIMARY, COMPARE)
        .add_edge(TECHNICAL_PRIMARY, COMPARE)
        .add_edge(FUNDAMENTAL_SECONDARY, COMPARE)
        .add_edge(TECHNICAL_SECONDARY, COMPARE)
        .compile()?)
}
