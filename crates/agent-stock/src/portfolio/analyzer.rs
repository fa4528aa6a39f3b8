//! Portfolio analysis workflow
//!
//! Holdings are analyzed one after another with a pause in between; for each
//! holding the fundamental and technical producers run concurrently and the
//! rule chain turns their scores into an action.

use super::decision::decide;
use super::holding::Holding;
use super::summary::{HoldingAnalysis, PortfolioReport};
use crate::agents::{AnalysisProducer, InputBundle, ProducerSet};
use crate::config::StockConfig;
use crate::data::DataSource;
use agent_core::ExecContext;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Analyzer for a whole portfolio
pub struct PortfolioAnalyzer {
    source: Arc<dyn DataSource>,
    fundamental: Arc<dyn AnalysisProducer>,
    technical: Arc<dyn AnalysisProducer>,
    historical_days: u32,
    time_horizon: String,
    holding_delay: Duration,
}

impl PortfolioAnalyzer {
    pub fn new(source: Arc<dyn DataSource>, producers: &ProducerSet, config: &StockConfig) -> Self {
        Self {
            source,
            fundamental: Arc::clone(&producers.fundamental),
            technical: Arc::clone(&producers.technical),
            historical_days: config.historical_days,
            time_horizon: config.time_horizon.clone(),
            holding_delay: config.holding_delay,
        }
    }

    /// Analyze every holding and aggregate the results
    ///
    /// Never fails: a holding without data, or one reached after `ctx` is
    /// done, is reported as HOLD with its error.
    pub async fn analyze(&self, holdings: &[Holding], ctx: &ExecContext) -> PortfolioReport {
        info!("Analyzing portfolio of {} holdings", holdings.len());

        let mut analyses = Vec::with_capacity(holdings.len());
        for (idx, holding) in holdings.iter().enumerate() {
            if idx > 0 && !self.holding_delay.is_zero() {
                if let Err(err) = ctx.run(tokio::time::sleep(self.holding_delay)).await {
                    debug!("Inter-holding delay interrupted: {}", err);
                }
            }
            debug!("Analyzing {} ({}/{})", holding.ticker(), idx + 1, holdings.len());
            analyses.push(self.analyze_holding(holding, ctx).await);
        }

        let report = PortfolioReport::new(holdings, analyses);
        info!(
            "Portfolio analysis done: {} ({:.2}%)",
            report.insights.overall_health, report.total_pnl_percent
        );
        report
    }

    async fn analyze_holding(&self, holding: &Holding, ctx: &ExecContext) -> HoldingAnalysis {
        let ticker = holding.ticker();
        let data = match ctx
            .run(self.source.get_stock_data(ticker, self.historical_days))
            .await
        {
            Ok(Ok(Some(data))) if data.is_valid() => data,
            Ok(Ok(_)) => return HoldingAnalysis::unavailable(holding, "Could not fetch data"),
            Ok(Err(err)) => {
                warn!("Data error for {}: {}", ticker, err);
                return HoldingAnalysis::unavailable(holding, err.to_string());
            }
            Err(err) => return HoldingAnalysis::unavailable(holding, err.to_string()),
        };

        let priced = match holding.clone().with_current_price(data.current_price()) {
            Ok(priced) => priced,
            Err(err) => return HoldingAnalysis::unavailable(holding, err.to_string()),
        };
        let name = Some(data.name.clone()).filter(|name| !name.is_empty());

        let bundle = InputBundle::new(ticker)
            .with_time_horizon(self.time_horizon.as_str())
            .with_stock_data(Some(Arc::new(data)));
        let (fundamental, technical) = tokio::join!(
            self.score(self.fundamental.as_ref(), bundle.clone(), ctx),
            self.score(self.technical.as_ref(), bundle, ctx),
        );

        let decision = decide(&priced, priced.pnl_percent(), fundamental, technical);
        debug!(
            "{}: {} ({}) - {}",
            ticker, decision.action, decision.priority, decision.reason
        );
        HoldingAnalysis::priced(&priced, name, fundamental, technical, decision)
    }

    /// Producer score, `None` when the producer failed, panicked or ran out of time
    async fn score(
        &self,
        producer: &dyn AnalysisProducer,
        input: InputBundle,
        ctx: &ExecContext,
    ) -> Option<u8> {
        let ticker = input.ticker.clone();
        let guarded = AssertUnwindSafe(producer.analyze(input, ctx)).catch_unwind();
        match ctx.run(guarded).await {
            Ok(Ok(Ok(report))) => Some(report.score()),
            Ok(Ok(Err(err))) => {
                warn!("{} producer failed for {}: {}", producer.kind(), ticker, err);
                None
            }
            Ok(Err(_)) => {
                warn!("{} producer panicked for {}", producer.kind(), ticker);
                None
            }
            Err(err) => {
                warn!("{} producer interrupted for {}: {}", producer.kind(), ticker, err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AnalysisKind;
    use crate::portfolio::{HealthBand, PortfolioAction, Priority};
    use crate::testing::{FailMode, ProducerKit, StaticProducer, StaticSource, snapshot};
    use std::time::Instant;

    fn config(delay: Duration) -> StockConfig {
        StockConfig::builder().holding_delay(delay).build().unwrap()
    }

    fn source() -> Arc<dyn DataSource> {
        Arc::new(
            StaticSource::default()
                .with_stock(snapshot("TCS", 126.0, 10))
                .with_stock(snapshot("INFY", 80.0, 10))
                .with_stock(snapshot("WIPRO", 104.0, 10)),
        )
    }

    fn holdings() -> Vec<Holding> {
        vec![
            Holding::new("TCS", 10.0, 100.0).unwrap(),
            Holding::new("INFY", 10.0, 100.0).unwrap(),
            Holding::new("WIPRO", 10.0, 100.0).unwrap(),
        ]
    }

    #[tokio::test]
    async fn test_portfolio_decisions() {
        let kit = ProducerKit {
            fundamental: Arc::new(StaticProducer::new(AnalysisKind::Fundamental, 30)),
            technical: Arc::new(StaticProducer::new(AnalysisKind::Technical, 40)),
            ..ProducerKit::default()
        };
        let analyzer = PortfolioAnalyzer::new(source(), &kit.set(), &config(Duration::ZERO));

        let report = analyzer.analyze(&holdings(), &ExecContext::new()).await;

        let decisions: Vec<_> = report
            .holdings
            .iter()
            .map(|h| (h.ticker.as_str(), h.action(), h.priority()))
            .collect();
        assert_eq!(
            decisions,
            [
                ("TCS", PortfolioAction::BookPartial50, Priority::High),
                ("INFY", PortfolioAction::BookAll, Priority::Urgent),
                ("WIPRO", PortfolioAction::BookAll, Priority::High),
            ]
        );
        assert_eq!(report.total_invested, 3000.0);
        assert_eq!(report.total_value, 3100.0);
        assert_eq!(report.insights.action_required_count, 3);
        assert_eq!(report.insights.urgent_actions, 1);
        assert_eq!(report.insights.overall_health, HealthBand::Neutral);
        assert_eq!(kit.fundamental.calls(), 3);
        assert_eq!(kit.technical.calls(), 3);
    }

    #[tokio::test]
    async fn test_missing_data_holds_with_error() {
        let kit = ProducerKit::default();
        let analyzer = PortfolioAnalyzer::new(source(), &kit.set(), &config(Duration::ZERO));
        let holdings = vec![Holding::new("UNKNOWN", 1.0, 50.0).unwrap()];

        let report = analyzer.analyze(&holdings, &ExecContext::new()).await;

        let analysis = &report.holdings[0];
        assert_eq!(analysis.action(), PortfolioAction::Hold);
        assert_eq!(analysis.error.as_deref(), Some("Could not fetch data"));
        assert_eq!(report.total_invested, 50.0);
        assert_eq!(report.total_value, 0.0);
        assert_eq!(kit.fundamental.calls(), 0);
    }

    #[tokio::test]
    async fn test_failing_producer_defaults_score() {
        let kit = ProducerKit {
            technical: Arc::new(
                StaticProducer::new(AnalysisKind::Technical, 90).failing(FailMode::Panic),
            ),
            ..ProducerKit::default()
        };
        let analyzer = PortfolioAnalyzer::new(source(), &kit.set(), &config(Duration::ZERO));
        let holdings = vec![Holding::new("WIPRO", 10.0, 100.0).unwrap()];

        let report = analyzer.analyze(&holdings, &ExecContext::new()).await;

        let analysis = &report.holdings[0];
        assert_eq!(analysis.technical_score, None);
        assert_eq!(analysis.fundamental_score, Some(72));
        assert_eq!(analysis.decision.notes, ["Fund: 72/100, Tech: 50/100"]);
    }

    #[tokio::test]
    async fn test_delay_between_holdings() {
        let kit = ProducerKit::default();
        let analyzer =
            PortfolioAnalyzer::new(source(), &kit.set(), &config(Duration::from_millis(30)));

        let started = Instant::now();
        analyzer.analyze(&holdings(), &ExecContext::new()).await;

        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_cancelled_run_reports_every_holding() {
        let kit = ProducerKit::default();
        let analyzer = PortfolioAnalyzer::new(source(), &kit.set(), &config(Duration::ZERO));
        let ctx = ExecContext::new();
        ctx.cancel();

        let report = analyzer.analyze(&holdings(), &ctx).await;

        assert_eq!(report.holdings.len(), 3);
        assert_eq!(report.failures().count(), 3);
        assert!(
            report
                .holdings
                .iter()
                .all(|h| h.error.as_deref() == Some("Cancelled"))
        );
    }
}
