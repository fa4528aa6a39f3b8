//! Per-run pipeline state
//!
//! [`AnalysisState`] is a typed record with one optional slot per stage
//! output. Stages never mutate it directly: they return [`StateUpdate`]s and
//! the executor applies them. Every slot has exactly one writer in any
//! topology; a second write is rejected and recorded as an error.

use crate::agents::AnalysisReport;
use crate::data::{MarketSnapshot, NewsDigest, PriceSnapshot, StockSnapshot};
use crate::intent::{Intent, IntentKind};
use crate::router::ExecutionPath;
use crate::synthesis::WeightedScoreResult;
use agent_workflow::WorkflowState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Stage name used for failures raised before the pipeline starts
pub const ROUTER_STAGE: &str = "router";
/// Stage name used for failures of the executor itself
pub const EXECUTOR_STAGE: &str = "executor";

/// Named output slots of [`AnalysisState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Price,
    StockData,
    StockData2,
    NewsData,
    MarketData,
    FundamentalAnalysis,
    FundamentalAnalysis2,
    TechnicalAnalysis,
    TechnicalAnalysis2,
    SentimentAnalysis,
    RiskAnalysis,
    WeightedScores,
    Recommendation,
}

impl Slot {
    pub const ALL: [Slot; 13] = [
        Self::Price,
        Self::StockData,
        Self::StockData2,
        Self::NewsData,
        Self::MarketData,
        Self::FundamentalAnalysis,
        Self::FundamentalAnalysis2,
        Self::TechnicalAnalysis,
        Self::TechnicalAnalysis2,
        Self::SentimentAnalysis,
        Self::RiskAnalysis,
        Self::WeightedScores,
        Self::Recommendation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::StockData => "stock_data",
            Self::StockData2 => "stock_data_2",
            Self::NewsData => "news_data",
            Self::MarketData => "market_data",
            Self::FundamentalAnalysis => "fundamental_analysis",
            Self::FundamentalAnalysis2 => "fundamental_analysis_2",
            Self::TechnicalAnalysis => "technical_analysis",
            Self::TechnicalAnalysis2 => "technical_analysis_2",
            Self::SentimentAnalysis => "sentiment_analysis",
            Self::RiskAnalysis => "risk_analysis",
            Self::WeightedScores => "weighted_scores",
            Self::Recommendation => "recommendation",
        }
    }

    /// Slots every successful run of `path` fills
    ///
    /// For the single-aspect path the producer slot depends on `kind`.
    pub fn expected(path: ExecutionPath, kind: IntentKind) -> &'static [Slot] {
        match (path, kind) {
            (ExecutionPath::Fast, _) => &[Self::Price],
            (ExecutionPath::Single, IntentKind::TechnicalAnalysis) => {
                &[Self::StockData, Self::TechnicalAnalysis]
            }
            (ExecutionPath::Single, IntentKind::FundamentalAnalysis) => {
                &[Self::StockData, Self::FundamentalAnalysis]
            }
            (ExecutionPath::Single, _) => &[
                Self::StockData,
                Self::NewsData,
                Self::MarketData,
                Self::SentimentAnalysis,
            ],
            (ExecutionPath::Standard | ExecutionPath::DeepDive, _) => &[
                Self::StockData,
                Self::NewsData,
                Self::MarketData,
                Self::FundamentalAnalysis,
                Self::TechnicalAnalysis,
                Self::SentimentAnalysis,
                Self::RiskAnalysis,
                Self::WeightedScores,
                Self::Recommendation,
            ],
            (ExecutionPath::Comparison, _) => &[
                Self::StockData,
                Self::StockData2,
                Self::FundamentalAnalysis,
                Self::TechnicalAnalysis,
                Self::FundamentalAnalysis2,
                Self::TechnicalAnalysis2,
                Self::Recommendation,
            ],
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed write produced by a stage
#[derive(Debug, Clone)]
pub enum StateUpdate {
    Price(PriceSnapshot),
    StockData(StockSnapshot),
    StockData2(StockSnapshot),
    NewsData(NewsDigest),
    MarketData(MarketSnapshot),
    FundamentalAnalysis(AnalysisReport),
    FundamentalAnalysis2(AnalysisReport),
    TechnicalAnalysis(AnalysisReport),
    TechnicalAnalysis2(AnalysisReport),
    SentimentAnalysis(AnalysisReport),
    RiskAnalysis(AnalysisReport),
    WeightedScores(WeightedScoreResult),
    Recommendation(AnalysisReport),
    /// Human-readable progress line
    Progress(String),
    /// Partial failure inside an otherwise completed stage
    Error(String),
}

impl StateUpdate {
    /// Slot written by this update, `None` for progress and errors
    pub fn slot(&self) -> Option<Slot> {
        Some(match self {
            Self::Price(_) => Slot::Price,
            Self::StockData(_) => Slot::StockData,
            Self::StockData2(_) => Slot::StockData2,
            Self::NewsData(_) => Slot::NewsData,
            Self::MarketData(_) => Slot::MarketData,
            Self::FundamentalAnalysis(_) => Slot::FundamentalAnalysis,
            Self::FundamentalAnalysis2(_) => Slot::FundamentalAnalysis2,
            Self::TechnicalAnalysis(_) => Slot::TechnicalAnalysis,
            Self::TechnicalAnalysis2(_) => Slot::TechnicalAnalysis2,
            Self::SentimentAnalysis(_) => Slot::SentimentAnalysis,
            Self::RiskAnalysis(_) => Slot::RiskAnalysis,
            Self::WeightedScores(_) => Slot::WeightedScores,
            Self::Recommendation(_) => Slot::Recommendation,
            Self::Progress(_) | Self::Error(_) => return None,
        })
    }
}

/// An error entry, tagged with the stage that raised it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageFailure {
    pub stage: String,
    pub message: String,
}

impl StageFailure {
    pub fn new(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.message)
    }
}

/// Overall outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// No errors recorded
    Success,
    /// Errors recorded, but some output is available
    Partial,
    /// Nothing usable was produced
    Failed,
}

/// State of one analysis run
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisState {
    run_id: Uuid,
    intent: IntentKind,
    path: Option<ExecutionPath>,
    tickers: Vec<String>,
    detail_mode: bool,
    time_horizon: String,

    price: Option<Arc<PriceSnapshot>>,
    stock_data: Option<Arc<StockSnapshot>>,
    stock_data_2: Option<Arc<StockSnapshot>>,
    news_data: Option<Arc<NewsDigest>>,
    market_data: Option<Arc<MarketSnapshot>>,
    fundamental_analysis: Option<AnalysisReport>,
    fundamental_analysis_2: Option<AnalysisReport>,
    technical_analysis: Option<AnalysisReport>,
    technical_analysis_2: Option<AnalysisReport>,
    sentiment_analysis: Option<AnalysisReport>,
    risk_analysis: Option<AnalysisReport>,
    weighted_scores: Option<WeightedScoreResult>,
    recommendation: Option<AnalysisReport>,

    errors: Vec<StageFailure>,
    progress: Vec<String>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl AnalysisState {
    /// Fresh state for a routed intent
    pub fn new(intent: &Intent, path: ExecutionPath, time_horizon: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            intent: intent.kind(),
            path: Some(path),
            tickers: intent.tickers().to_vec(),
            detail_mode: intent.kind().is_detailed(),
            time_horizon: time_horizon.into(),
            price: None,
            stock_data: None,
            stock_data_2: None,
            news_data: None,
            market_data: None,
            fundamental_analysis: None,
            fundamental_analysis_2: None,
            technical_analysis: None,
            technical_analysis_2: None,
            sentiment_analysis: None,
            risk_analysis: None,
            weighted_scores: None,
            recommendation: None,
            errors: Vec::new(),
            progress: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Finished state for an intent the router refused
    pub fn rejected(intent: &Intent, reason: impl Into<String>) -> Self {
        let mut state = Self::new(intent, ExecutionPath::Fast, String::new());
        state.path = None;
        state.detail_mode = false;
        state.record_error(ROUTER_STAGE, &reason.into());
        state.finish();
        state
    }

    /// Stamp the finish time
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    // =========== Accessors ===========

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn intent(&self) -> IntentKind {
        self.intent
    }

    /// Execution path, `None` when the router rejected the intent
    pub fn path(&self) -> Option<ExecutionPath> {
        self.path
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn primary_ticker(&self) -> &str {
        self.tickers.first().map_or("", String::as_str)
    }

    pub fn secondary_ticker(&self) -> &str {
        self.tickers.get(1).map_or("", String::as_str)
    }

    pub fn detail_mode(&self) -> bool {
        self.detail_mode
    }

    pub fn time_horizon(&self) -> &str {
        &self.time_horizon
    }

    pub fn price(&self) -> Option<&PriceSnapshot> {
        self.price.as_deref()
    }

    pub fn stock_data(&self) -> Option<&Arc<StockSnapshot>> {
        self.stock_data.as_ref()
    }

    pub fn stock_data_2(&self) -> Option<&Arc<StockSnapshot>> {
        self.stock_data_2.as_ref()
    }

    pub fn news_data(&self) -> Option<&Arc<NewsDigest>> {
        self.news_data.as_ref()
    }

    pub fn market_data(&self) -> Option<&Arc<MarketSnapshot>> {
        self.market_data.as_ref()
    }

    pub fn fundamental_analysis(&self) -> Option<&AnalysisReport> {
        self.fundamental_analysis.as_ref()
    }

    pub fn fundamental_analysis_2(&self) -> Option<&AnalysisReport> {
        self.fundamental_analysis_2.as_ref()
    }

    pub fn technical_analysis(&self) -> Option<&AnalysisReport> {
        self.technical_analysis.as_ref()
    }

    pub fn technical_analysis_2(&self) -> Option<&AnalysisReport> {
        self.technical_analysis_2.as_ref()
    }

    pub fn sentiment_analysis(&self) -> Option<&AnalysisReport> {
        self.sentiment_analysis.as_ref()
    }

    pub fn risk_analysis(&self) -> Option<&AnalysisReport> {
        self.risk_analysis.as_ref()
    }

    pub fn weighted_scores(&self) -> Option<&WeightedScoreResult> {
        self.weighted_scores.as_ref()
    }

    pub fn recommendation(&self) -> Option<&AnalysisReport> {
        self.recommendation.as_ref()
    }

    pub fn errors(&self) -> &[StageFailure] {
        &self.errors
    }

    /// Errors raised by one stage
    pub fn errors_for(&self, stage: &str) -> Vec<&StageFailure> {
        self.errors.iter().filter(|e| e.stage == stage).collect()
    }

    pub fn progress(&self) -> &[String] {
        &self.progress
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    // =========== Slot Queries ===========

    /// Whether a slot holds a value
    pub fn is_filled(&self, slot: Slot) -> bool {
        match slot {
            Slot::Price => self.price.is_some(),
            Slot::StockData => self.stock_data.is_some(),
            Slot::StockData2 => self.stock_data_2.is_some(),
            Slot::NewsData => self.news_data.is_some(),
            Slot::MarketData => self.market_data.is_some(),
            Slot::FundamentalAnalysis => self.fundamental_analysis.is_some(),
            Slot::FundamentalAnalysis2 => self.fundamental_analysis_2.is_some(),
            Slot::TechnicalAnalysis => self.technical_analysis.is_some(),
            Slot::TechnicalAnalysis2 => self.technical_analysis_2.is_some(),
            Slot::SentimentAnalysis => self.sentiment_analysis.is_some(),
            Slot::RiskAnalysis => self.risk_analysis.is_some(),
            Slot::WeightedScores => self.weighted_scores.is_some(),
            Slot::Recommendation => self.recommendation.is_some(),
        }
    }

    pub fn filled_slots(&self) -> Vec<Slot> {
        Slot::ALL
            .into_iter()
            .filter(|slot| self.is_filled(*slot))
            .collect()
    }

    /// Expected slots of this run's path that stayed empty
    pub fn missing_slots(&self) -> Vec<Slot> {
        self.path.map_or_else(Vec::new, |path| {
            Slot::expected(path, self.intent)
                .iter()
                .copied()
                .filter(|slot| !self.is_filled(*slot))
                .collect()
        })
    }

    pub fn status(&self) -> RunStatus {
        if self.errors.is_empty() {
            RunStatus::Success
        } else if Slot::ALL.iter().any(|slot| self.is_filled(*slot)) {
            RunStatus::Partial
        } else {
            RunStatus::Failed
        }
    }

    fn store(&mut self, stage: &str, update: StateUpdate) {
        match update {
            StateUpdate::Price(v) => self.price = Some(Arc::new(v)),
            StateUpdate::StockData(v) => self.stock_data = Some(Arc::new(v)),
            StateUpdate::StockData2(v) => self.stock_data_2 = Some(Arc::new(v)),
            StateUpdate::NewsData(v) => self.news_data = Some(Arc::new(v)),
            StateUpdate::MarketData(v) => self.market_data = Some(Arc::new(v)),
            StateUpdate::FundamentalAnalysis(v) => self.fundamental_analysis = Some(v),
            StateUpdate::FundamentalAnalysis2(v) => self.fundamental_analysis_2 = Some(v),
            StateUpdate::TechnicalAnalysis(v) => self.technical_analysis = Some(v),
            StateUpdate::TechnicalAnalysis2(v) => self.technical_analysis_2 = Some(v),
            StateUpdate::SentimentAnalysis(v) => self.sentiment_analysis = Some(v),
            StateUpdate::RiskAnalysis(v) => self.risk_analysis = Some(v),
            StateUpdate::WeightedScores(v) => self.weighted_scores = Some(v),
            StateUpdate::Recommendation(v) => self.recommendation = Some(v),
            StateUpdate::Progress(line) => self.progress.push(line),
            StateUpdate::Error(message) => self.record_error(stage, &message),
        }
    }
}

impl WorkflowState for AnalysisState {
    type Update = StateUpdate;

    fn apply(&mut self, stage: &str, update: StateUpdate) {
        if let Some(slot) = update.slot().filter(|slot| self.is_filled(*slot)) {
            tracing::warn!("Stage '{}' tried to overwrite slot '{}'", stage, slot);
            self.record_error(stage, &format!("slot '{slot}' already written"));
            return;
        }
        self.store(stage, update);
    }

    fn record_error(&mut self, stage: &str, message: &str) {
        self.errors.push(StageFailure::new(stage, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AnalysisKind;

    fn state(kind: IntentKind, path: ExecutionPath) -> AnalysisState {
        AnalysisState::new(&Intent::certain(kind, ["TCS", "INFY"]), path, "medium")
    }

    #[test]
    fn test_new_state() {
        let state = state(IntentKind::DeepDive, ExecutionPath::DeepDive);
        assert!(state.detail_mode());
        assert_eq!(state.primary_ticker(), "TCS");
        assert_eq!(state.secondary_ticker(), "INFY");
        assert_eq!(state.status(), RunStatus::Success);
        assert!(state.finished_at().is_none());
        assert_eq!(state.missing_slots().len(), 9);
    }

    #[test]
    fn test_apply_fills_slots_and_progress() {
        let mut state = state(IntentKind::TechnicalAnalysis, ExecutionPath::Single);
        state.apply(
            "single_producer",
            StateUpdate::TechnicalAnalysis(AnalysisReport::new(AnalysisKind::Technical, 61)),
        );
        state.apply("single_producer", StateUpdate::Progress("✅ Technical: 61/100".to_string()));

        assert_eq!(state.technical_analysis().map(AnalysisReport::score), Some(61));
        assert_eq!(state.progress(), ["✅ Technical: 61/100"]);
        assert_eq!(state.missing_slots(), vec![Slot::StockData]);
    }

    #[test]
    fn test_second_write_rejected() {
        let mut state = state(IntentKind::FullAnalysis, ExecutionPath::Standard);
        state.apply("a", StateUpdate::RiskAnalysis(AnalysisReport::new(AnalysisKind::Risk, 20)));
        state.apply("b", StateUpdate::RiskAnalysis(AnalysisReport::new(AnalysisKind::Risk, 90)));

        assert_eq!(state.risk_analysis().map(AnalysisReport::score), Some(20));
        assert_eq!(
            state.errors(),
            [StageFailure::new("b", "slot 'risk_analysis' already written")]
        );
    }

    #[test]
    fn test_error_update_tagged_with_stage() {
        let mut state = state(IntentKind::FullAnalysis, ExecutionPath::Standard);
        state.apply("collect_all", StateUpdate::Error("News data error: timeout".to_string()));

        assert_eq!(state.errors_for("collect_all").len(), 1);
        assert_eq!(state.errors()[0].to_string(), "[collect_all] News data error: timeout");
    }

    #[test]
    fn test_status() {
        let mut state = state(IntentKind::FullAnalysis, ExecutionPath::Standard);
        state.record_error("fundamental", "boom");
        assert_eq!(state.status(), RunStatus::Failed);

        state.apply(
            "technical",
            StateUpdate::TechnicalAnalysis(AnalysisReport::new(AnalysisKind::Technical, 50)),
        );
        assert_eq!(state.status(), RunStatus::Partial);
    }

    #[test]
    fn test_rejected_state() {
        let intent = Intent::certain(IntentKind::Comparison, ["TCS"]);
        let state = AnalysisState::rejected(&intent, "Please specify two tickers");

        assert_eq!(state.path(), None);
        assert_eq!(state.status(), RunStatus::Failed);
        assert_eq!(state.errors()[0].stage, ROUTER_STAGE);
        assert!(state.finished_at().is_some());
        assert!(state.missing_slots().is_empty());
    }

    #[test]
    fn test_expected_slots_for_single_aspect() {
        assert_eq!(
            Slot::expected(ExecutionPath::Single, IntentKind::FundamentalAnalysis),
            [Slot::StockData, Slot::FundamentalAnalysis]
        );
        assert!(
            Slot::expected(ExecutionPath::Single, IntentKind::SentimentAnalysis)
                .contains(&Slot::NewsData)
        );
    }
}
