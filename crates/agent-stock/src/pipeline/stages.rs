//! Pipeline stages
//!
//! Data collection stages call the [`DataSource`]; analysis stages build an
//! [`InputBundle`] from the state snapshot and call a producer. Every
//! external call is raced against the stage's [`ExecContext`].

use super::state::{AnalysisState, Slot, StateUpdate};
use crate::agents::{
    AnalysisKind, AnalysisProducer, AnalysisReport, CompareSide, ComparisonBundle,
    ComparisonProducer, InputBundle,
};
use crate::data::DataSource;
use crate::error::StockError;
use crate::intent::IntentKind;
use crate::router::ExecutionPath;
use crate::synthesis::{Horizon, ScoreInputs, synthesize};
use agent_core::{Error, ExecContext, Result};
use agent_workflow::Stage;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

fn failed(message: impl Into<String>) -> Error {
    Error::ProcessingFailed(message.into())
}

/// Which ticker of the intent a stage works on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Primary,
    Secondary,
}

impl Side {
    fn ticker(self, state: &AnalysisState) -> &str {
        match self {
            Self::Primary => state.primary_ticker(),
            Self::Secondary => state.secondary_ticker(),
        }
    }

    fn stock_data(self, state: &AnalysisState) -> Option<Arc<crate::data::StockSnapshot>> {
        match self {
            Self::Primary => state.stock_data().cloned(),
            Self::Secondary => state.stock_data_2().cloned(),
        }
    }
}

/// Slot a producer of `kind` writes for `side`, if that combination exists
pub fn report_slot(kind: AnalysisKind, side: Side) -> Option<Slot> {
    match (kind, side) {
        (AnalysisKind::Fundamental, Side::Primary) => Some(Slot::FundamentalAnalysis),
        (AnalysisKind::Fundamental, Side::Secondary) => Some(Slot::FundamentalAnalysis2),
        (AnalysisKind::Technical, Side::Primary) => Some(Slot::TechnicalAnalysis),
        (AnalysisKind::Technical, Side::Secondary) => Some(Slot::TechnicalAnalysis2),
        (AnalysisKind::Sentiment, Side::Primary) => Some(Slot::SentimentAnalysis),
        (AnalysisKind::Risk, Side::Primary) => Some(Slot::RiskAnalysis),
        _ => None,
    }
}

fn report_update(slot: Slot, report: AnalysisReport) -> Option<StateUpdate> {
    match slot {
        Slot::FundamentalAnalysis => Some(StateUpdate::FundamentalAnalysis(report)),
        Slot::FundamentalAnalysis2 => Some(StateUpdate::FundamentalAnalysis2(report)),
        Slot::TechnicalAnalysis => Some(StateUpdate::TechnicalAnalysis(report)),
        Slot::TechnicalAnalysis2 => Some(StateUpdate::TechnicalAnalysis2(report)),
        Slot::SentimentAnalysis => Some(StateUpdate::SentimentAnalysis(report)),
        Slot::RiskAnalysis => Some(StateUpdate::RiskAnalysis(report)),
        Slot::Recommendation => Some(StateUpdate::Recommendation(report)),
        _ => None,
    }
}

fn kind_label(kind: AnalysisKind) -> &'static str {
    match kind {
        AnalysisKind::Fundamental => "Fundamental",
        AnalysisKind::Technical => "Technical",
        AnalysisKind::Sentiment => "Sentiment",
        AnalysisKind::Risk => "Risk",
        AnalysisKind::Synthesis => "Synthesis",
        AnalysisKind::Comparison => "Comparison",
    }
}

/// Call a producer under the context, mapping its error into the stage error
async fn call_producer(
    producer: &dyn AnalysisProducer,
    input: InputBundle,
    ctx: &ExecContext,
) -> Result<AnalysisReport> {
    ctx.run(producer.analyze(input, ctx))
        .await?
        .map_err(Error::from)
}

// =========== Data Collection ===========

/// Quote lookup for the fast path
pub struct CollectPrice {
    source: Arc<dyn DataSource>,
}

impl CollectPrice {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Stage<AnalysisState> for CollectPrice {
    async fn run(&self, state: Arc<AnalysisState>, ctx: &ExecContext) -> Result<Vec<StateUpdate>> {
        let ticker = state.primary_ticker();
        match ctx.run(self.source.get_quick_price(ticker)).await? {
            Ok(Some(price)) => Ok(vec![
                StateUpdate::Price(price),
                StateUpdate::Progress("✅ Price data fetched".to_string()),
            ]),
            Ok(None) => Err(failed(format!("Could not fetch price for {ticker}"))),
            Err(err) => Err(failed(format!("Price fetch error: {err}"))),
        }
    }
}

/// When [`CollectData`] also fetches news and market context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextPolicy {
    Always,
    /// Only for sentiment intents
    SentimentOnly,
}

/// Stock data collection, optionally with news and market data fetched
/// concurrently; each missing piece becomes its own error entry
pub struct CollectData {
    source: Arc<dyn DataSource>,
    historical_days: u32,
    policy: ContextPolicy,
}

impl CollectData {
    pub fn new(source: Arc<dyn DataSource>, historical_days: u32, policy: ContextPolicy) -> Self {
        Self {
            source,
            historical_days,
            policy,
        }
    }

    fn wants_context(&self, state: &AnalysisState) -> bool {
        match self.policy {
            ContextPolicy::Always => true,
            ContextPolicy::SentimentOnly => state.intent() == IntentKind::SentimentAnalysis,
        }
    }
}

type Fetched<T> = Result<crate::error::Result<Option<T>>>;

fn stock_updates(
    ticker: &str,
    fetched: Fetched<crate::data::StockSnapshot>,
    updates: &mut Vec<StateUpdate>,
) {
    match fetched {
        Ok(Ok(Some(snapshot))) => {
            let days = snapshot.historical.len();
            updates.push(StateUpdate::StockData(snapshot));
            updates.push(StateUpdate::Progress(if days > 0 {
                format!("✅ Stock data collected ({days} days historical)")
            } else {
                "⚠️ Stock data collected (no historical data for technical analysis)".to_string()
            }));
        }
        Ok(Ok(None)) => updates.push(StateUpdate::Error(format!("Could not fetch data for {ticker}"))),
        Ok(Err(err)) => updates.push(StateUpdate::Error(format!("Stock data error: {err}"))),
        Err(err) => updates.push(StateUpdate::Error(format!("Stock data error: {err}"))),
    }
}

fn context_updates<T>(
    label: &str,
    fetched: Fetched<T>,
    wrap: fn(T) -> StateUpdate,
    updates: &mut Vec<StateUpdate>,
) {
    match fetched {
        Ok(Ok(Some(value))) => {
            updates.push(wrap(value));
            updates.push(StateUpdate::Progress(format!("✅ {label} data collected")));
        }
        Ok(Ok(None)) => updates.push(StateUpdate::Error(format!("{label} data unavailable"))),
        Ok(Err(err)) => updates.push(StateUpdate::Error(format!("{label} data error: {err}"))),
        Err(err) => updates.push(StateUpdate::Error(format!("{label} data error: {err}"))),
    }
}

#[async_trait]
impl Stage<AnalysisState> for CollectData {
    async fn run(&self, state: Arc<AnalysisState>, ctx: &ExecContext) -> Result<Vec<StateUpdate>> {
        let ticker = state.primary_ticker();
        let stock = ctx.run(self.source.get_stock_data(ticker, self.historical_days));
        let mut updates = Vec::new();

        if self.wants_context(&state) {
            debug!("Collecting stock, news and market data for {}", ticker);
            let (stock, news, market) = tokio::join!(
                stock,
                ctx.run(self.source.get_news(ticker)),
                ctx.run(self.source.get_market_data()),
            );
            stock_updates(ticker, stock, &mut updates);
            context_updates("News", news, StateUpdate::NewsData, &mut updates);
            context_updates("Market", market, StateUpdate::MarketData, &mut updates);
        } else {
            debug!("Collecting stock data for {}", ticker);
            stock_updates(ticker, stock.await, &mut updates);
        }

        Ok(updates)
    }
}

/// Stock data for one side of a comparison
pub struct CollectStock {
    source: Arc<dyn DataSource>,
    historical_days: u32,
    side: Side,
}

impl CollectStock {
    pub fn new(source: Arc<dyn DataSource>, historical_days: u32, side: Side) -> Self {
        Self {
            source,
            historical_days,
            side,
        }
    }
}

#[async_trait]
impl Stage<AnalysisState> for CollectStock {
    async fn run(&self, state: Arc<AnalysisState>, ctx: &ExecContext) -> Result<Vec<StateUpdate>> {
        let ticker = self.side.ticker(&state);
        let fetched = ctx
            .run(self.source.get_stock_data(ticker, self.historical_days))
            .await?;

        match fetched {
            Ok(Some(snapshot)) => {
                let progress = StateUpdate::Progress(format!("✅ {ticker} data collected"));
                Ok(match self.side {
                    Side::Primary => vec![StateUpdate::StockData(snapshot), progress],
                    Side::Secondary => vec![StateUpdate::StockData2(snapshot), progress],
                })
            }
            Ok(None) => Err(failed(format!("Could not fetch data for {ticker}"))),
            Err(err) => Err(failed(format!("Error fetching {ticker}: {err}"))),
        }
    }
}

// =========== Analysis ===========

/// Runs one producer for one side and stores its report
pub struct Analyze {
    producer: Arc<dyn AnalysisProducer>,
    side: Side,
    slot: Slot,
}

impl Analyze {
    /// Fails when the producer kind has no slot for `side`
    pub fn new(producer: Arc<dyn AnalysisProducer>, side: Side) -> crate::error::Result<Self> {
        let kind = producer.kind();
        let slot = report_slot(kind, side).ok_or_else(|| {
            StockError::ConfigError(format!("no {side:?} slot for {kind} producer"))
        })?;
        Ok(Self {
            producer,
            side,
            slot,
        })
    }

    pub fn kind(&self) -> AnalysisKind {
        self.producer.kind()
    }

    fn bundle(&self, state: &AnalysisState) -> Result<InputBundle> {
        let ticker = self.side.ticker(state);
        let stock_data = self
            .side
            .stock_data(state)
            .ok_or_else(|| failed(format!("No stock data for {} analysis", self.kind())))?;

        let mut bundle = InputBundle::new(ticker)
            .with_detail_mode(state.detail_mode())
            .with_time_horizon(state.time_horizon())
            .with_stock_data(Some(stock_data));

        match self.kind() {
            AnalysisKind::Sentiment => {
                bundle = bundle
                    .with_news(state.news_data().cloned())
                    .with_market(state.market_data().cloned());
            }
            AnalysisKind::Risk => {
                bundle = bundle
                    .with_upstream(state.fundamental_analysis())
                    .with_upstream(state.technical_analysis());
            }
            _ => {}
        }
        Ok(bundle)
    }
}

#[async_trait]
impl Stage<AnalysisState> for Analyze {
    async fn run(&self, state: Arc<AnalysisState>, ctx: &ExecContext) -> Result<Vec<StateUpdate>> {
        let bundle = self.bundle(&state)?;
        debug!("Running {} producer for {}", self.kind(), bundle.ticker);

        let report = call_producer(self.producer.as_ref(), bundle, ctx).await?;
        let prefix = if state.path() == Some(ExecutionPath::Comparison) {
            format!("{} ", self.side.ticker(&state))
        } else {
            String::new()
        };
        let progress = format!(
            "✅ {prefix}{}: {}/100",
            kind_label(self.kind()),
            report.score()
        );
        let update = report_update(self.slot, report)
            .ok_or_else(|| failed(format!("slot {} does not hold reports", self.slot)))?;

        Ok(vec![update, StateUpdate::Progress(progress)])
    }
}

/// Dispatches to the producer matching a single-aspect intent
pub struct AnalyzeAspect {
    technical: Analyze,
    fundamental: Analyze,
    sentiment: Analyze,
}

impl AnalyzeAspect {
    pub fn new(technical: Analyze, fundamental: Analyze, sentiment: Analyze) -> Self {
        Self {
            technical,
            fundamental,
            sentiment,
        }
    }

    fn select(&self, kind: IntentKind) -> Option<&Analyze> {
        match kind.aspect()? {
            "technical" => Some(&self.technical),
            "fundamental" => Some(&self.fundamental),
            "sentiment" => Some(&self.sentiment),
            _ => None,
        }
    }
}

#[async_trait]
impl Stage<AnalysisState> for AnalyzeAspect {
    async fn run(&self, state: Arc<AnalysisState>, ctx: &ExecContext) -> Result<Vec<StateUpdate>> {
        let stage = self
            .select(state.intent())
            .ok_or_else(|| failed(format!("No single-aspect producer for {}", state.intent())))?;
        stage.run(state, ctx).await
    }
}

/// Weighted scores plus the narrative recommendation
pub struct Synthesize {
    producer: Arc<dyn AnalysisProducer>,
}

impl Synthesize {
    pub fn new(producer: Arc<dyn AnalysisProducer>) -> Self {
        Self { producer }
    }
}

#[async_trait]
impl Stage<AnalysisState> for Synthesize {
    async fn run(&self, state: Arc<AnalysisState>, ctx: &ExecContext) -> Result<Vec<StateUpdate>> {
        let reports: Vec<&AnalysisReport> = [
            state.fundamental_analysis(),
            state.technical_analysis(),
            state.sentiment_analysis(),
            state.risk_analysis(),
        ]
        .into_iter()
        .flatten()
        .collect();
        if reports.is_empty() {
            return Err(failed("No analysis available to synthesize"));
        }

        let weighted = synthesize(
            &ScoreInputs::from_reports(reports.iter().copied()),
            Horizon::parse(state.time_horizon()),
        );
        debug!(
            "Weighted score for {}: {} ({} conflicts)",
            state.primary_ticker(),
            weighted.final_score,
            weighted.conflicts.len()
        );

        let bundle = reports.iter().fold(
            InputBundle::new(state.primary_ticker())
                .with_detail_mode(state.detail_mode())
                .with_time_horizon(state.time_horizon())
                .with_stock_data(state.stock_data().cloned())
                .with_news(state.news_data().cloned())
                .with_market(state.market_data().cloned())
                .with_weighted_scores(weighted.clone()),
            |bundle, report| bundle.with_upstream(Some(report)),
        );

        let mut updates = vec![StateUpdate::WeightedScores(weighted)];
        match call_producer(self.producer.as_ref(), bundle, ctx).await {
            Ok(report) => {
                updates.push(StateUpdate::Recommendation(report));
                updates.push(StateUpdate::Progress("✅ Recommendation generated".to_string()));
            }
            Err(err) => updates.push(StateUpdate::Error(format!("Synthesis error: {err}"))),
        }
        Ok(updates)
    }
}

/// Side-by-side comparison of both tickers
pub struct Compare {
    producer: Arc<dyn ComparisonProducer>,
}

impl Compare {
    pub fn new(producer: Arc<dyn ComparisonProducer>) -> Self {
        Self { producer }
    }
}

#[async_trait]
impl Stage<AnalysisState> for Compare {
    async fn run(&self, state: Arc<AnalysisState>, ctx: &ExecContext) -> Result<Vec<StateUpdate>> {
        let (Some(primary), Some(secondary)) = (state.stock_data(), state.stock_data_2()) else {
            return Err(failed("Missing stock data for comparison"));
        };

        let bundle = ComparisonBundle {
            primary: CompareSide {
                ticker: state.primary_ticker().to_string(),
                stock_data: Some(Arc::clone(primary)),
                fundamental: state.fundamental_analysis().cloned(),
                technical: state.technical_analysis().cloned(),
            },
            secondary: CompareSide {
                ticker: state.secondary_ticker().to_string(),
                stock_data: Some(Arc::clone(secondary)),
                fundamental: state.fundamental_analysis_2().cloned(),
                technical: state.technical_analysis_2().cloned(),
            },
            detail_mode: state.detail_mode(),
        };

        let report = ctx
            .run(self.producer.compare(bundle, ctx))
            .await?
            .map_err(Error::from)?;

        Ok(vec![
            StateUpdate::Recommendation(report),
            StateUpdate::Progress("✅ Comparison complete".to_string()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_slots() {
        assert_eq!(
            report_slot(AnalysisKind::Technical, Side::Secondary),
            Some(Slot::TechnicalAnalysis2)
        );
        assert_eq!(report_slot(AnalysisKind::Risk, Side::Secondary), None);
        assert_eq!(report_slot(AnalysisKind::Synthesis, Side::Primary), None);
    }

    #[test]
    fn test_report_update_only_for_report_slots() {
        let report = AnalysisReport::new(AnalysisKind::Risk, 10);
        assert!(report_update(Slot::RiskAnalysis, report.clone()).is_some());
        assert!(report_update(Slot::StockData, report).is_none());
    }
}
