//! Portfolio decision engine

pub mod analyzer;
pub mod decision;
pub mod holding;
pub mod summary;

pub use analyzer::PortfolioAnalyzer;
pub use decision::{
    ActionDecision, DecisionInput, FALLBACK, PortfolioAction, Priority, RULES, Rule, decide,
    evaluate, matching_rule,
};
pub use holding::Holding;
pub use summary::{
    HealthBand, HoldingAnalysis, Performer, PortfolioInsights, PortfolioReport, bucket_actions,
    insights,
};
