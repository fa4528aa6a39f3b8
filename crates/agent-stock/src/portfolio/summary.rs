//! Portfolio-level aggregation

use super::decision::{ActionDecision, PortfolioAction, Priority};
use super::holding::Holding;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Number of best and worst performers reported
const PERFORMER_COUNT: usize = 3;

/// Result for one holding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingAnalysis {
    pub ticker: String,
    pub name: Option<String>,
    pub quantity: f64,
    pub avg_price: f64,
    pub days_held: u32,
    pub cost_basis: f64,
    /// `None` when market data was unavailable
    pub current_price: Option<f64>,
    pub current_value: Option<f64>,
    pub pnl: Option<f64>,
    pub pnl_percent: Option<f64>,
    pub fundamental_score: Option<u8>,
    pub technical_score: Option<u8>,
    pub decision: ActionDecision,
    pub error: Option<String>,
}

impl HoldingAnalysis {
    /// Analysis of a holding whose price is known
    pub fn priced(
        holding: &Holding,
        name: Option<String>,
        fundamental_score: Option<u8>,
        technical_score: Option<u8>,
        decision: ActionDecision,
    ) -> Self {
        Self {
            ticker: holding.ticker().to_string(),
            name,
            quantity: holding.quantity(),
            avg_price: holding.avg_price(),
            days_held: holding.days_held(),
            cost_basis: holding.cost_basis(),
            current_price: Some(holding.current_price()),
            current_value: Some(holding.current_value()),
            pnl: Some(holding.pnl()),
            pnl_percent: Some(round2(holding.pnl_percent())),
            fundamental_score,
            technical_score,
            decision,
            error: None,
        }
    }

    /// HOLD placeholder for a holding that could not be analyzed
    pub fn unavailable(holding: &Holding, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            ticker: holding.ticker().to_string(),
            name: None,
            quantity: holding.quantity(),
            avg_price: holding.avg_price(),
            days_held: holding.days_held(),
            cost_basis: holding.cost_basis(),
            current_price: None,
            current_value: None,
            pnl: None,
            pnl_percent: None,
            fundamental_score: None,
            technical_score: None,
            decision: ActionDecision {
                action: PortfolioAction::Hold,
                priority: Priority::Low,
                reason: error.clone(),
                notes: Vec::new(),
            },
            error: Some(error),
        }
    }

    pub fn action(&self) -> PortfolioAction {
        self.decision.action
    }

    pub fn priority(&self) -> Priority {
        self.decision.priority
    }
}

/// Overall portfolio health, banded by total P&L percent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthBand {
    Excellent,
    Good,
    Neutral,
    Concerning,
    Poor,
}

impl HealthBand {
    pub fn from_pnl_percent(pnl_percent: f64) -> Self {
        if pnl_percent >= 15.0 {
            Self::Excellent
        } else if pnl_percent >= 5.0 {
            Self::Good
        } else if pnl_percent >= -5.0 {
            Self::Neutral
        } else if pnl_percent >= -15.0 {
            Self::Concerning
        } else {
            Self::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "EXCELLENT",
            Self::Good => "GOOD",
            Self::Neutral => "NEUTRAL",
            Self::Concerning => "CONCERNING",
            Self::Poor => "POOR",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Excellent | Self::Good => "🟢",
            Self::Neutral => "🟡",
            Self::Concerning => "🟠",
            Self::Poor => "🔴",
        }
    }
}

impl fmt::Display for HealthBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.emoji(), self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Performer {
    pub ticker: String,
    pub pnl_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioInsights {
    pub overall_health: HealthBand,
    pub urgent_actions: usize,
    pub high_priority_actions: usize,
    /// Highest P&L first
    pub best_performers: Vec<Performer>,
    /// Lowest P&L first
    pub worst_performers: Vec<Performer>,
    pub action_required_count: usize,
}

/// Tickers grouped by action; every action has an entry
pub fn bucket_actions(analyses: &[HoldingAnalysis]) -> BTreeMap<PortfolioAction, Vec<String>> {
    let mut buckets: BTreeMap<_, _> = PortfolioAction::ALL
        .into_iter()
        .map(|action| (action, Vec::new()))
        .collect();
    for analysis in analyses {
        buckets
            .entry(analysis.action())
            .or_insert_with(Vec::new)
            .push(analysis.ticker.clone());
    }
    buckets
}

pub fn insights(
    analyses: &[HoldingAnalysis],
    total_pnl_percent: f64,
    buckets: &BTreeMap<PortfolioAction, Vec<String>>,
) -> PortfolioInsights {
    let count = |priority| analyses.iter().filter(|a| a.priority() == priority).count();

    let mut ranked: Vec<Performer> = analyses
        .iter()
        .filter_map(|a| {
            a.pnl_percent.map(|pnl_percent| Performer {
                ticker: a.ticker.clone(),
                pnl_percent,
            })
        })
        .collect();
    ranked.sort_by(|a, b| b.pnl_percent.total_cmp(&a.pnl_percent));

    let best_performers = ranked.iter().take(PERFORMER_COUNT).cloned().collect();
    let worst_performers = ranked.iter().rev().take(PERFORMER_COUNT).cloned().collect();

    PortfolioInsights {
        overall_health: HealthBand::from_pnl_percent(total_pnl_percent),
        urgent_actions: count(Priority::Urgent),
        high_priority_actions: count(Priority::High),
        best_performers,
        worst_performers,
        action_required_count: buckets
            .iter()
            .filter(|(action, _)| action.requires_action())
            .map(|(_, tickers)| tickers.len())
            .sum(),
    }
}

/// Portfolio-wide result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioReport {
    pub generated_at: DateTime<Utc>,
    pub total_holdings: usize,
    /// Cost basis of every holding, analyzed or not
    pub total_invested: f64,
    /// Sums over holdings with market data
    pub total_value: f64,
    pub total_pnl: f64,
    pub total_pnl_percent: f64,
    pub holdings: Vec<HoldingAnalysis>,
    pub actions: BTreeMap<PortfolioAction, Vec<String>>,
    pub insights: PortfolioInsights,
}

impl PortfolioReport {
    pub fn new(holdings: &[Holding], analyses: Vec<HoldingAnalysis>) -> Self {
        let total_invested: f64 = holdings.iter().map(Holding::cost_basis).sum();
        let total_value: f64 = analyses.iter().filter_map(|a| a.current_value).sum();
        let total_pnl: f64 = analyses.iter().filter_map(|a| a.pnl).sum();
        let total_pnl_percent = if total_invested > 0.0 {
            round2(total_pnl / total_invested * 100.0)
        } else {
            0.0
        };

        let actions = bucket_actions(&analyses);
        let insights = insights(&analyses, total_pnl_percent, &actions);

        Self {
            generated_at: Utc::now(),
            total_holdings: holdings.len(),
            total_invested,
            total_value,
            total_pnl,
            total_pnl_percent,
            holdings: analyses,
            actions,
            insights,
        }
    }

    /// Holdings that could not be analyzed
    pub fn failures(&self) -> impl Iterator<Item = &HoldingAnalysis> {
        self.holdings.iter().filter(|a| a.error.is_some())
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
