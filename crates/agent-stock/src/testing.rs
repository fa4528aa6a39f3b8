//! In-memory collaborators shared by the unit tests

use crate::agents::{
    AnalysisKind, AnalysisProducer, AnalysisReport, ComparisonBundle, ComparisonProducer,
    InputBundle, ProducerSet,
};
use crate::data::{
    Candle, DataSource, MarketSnapshot, NewsDigest, PriceSnapshot, StockSnapshot,
};
use crate::error::{Result, StockError};
use agent_core::ExecContext;
use async_trait::async_trait;
use chrono::{Duration as Days, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn price(ticker: &str, current: f64) -> PriceSnapshot {
    PriceSnapshot {
        ticker: ticker.to_string(),
        current_price: current,
        change_percent: 1.2,
        change_absolute: current * 0.012,
        volume: 1_000_000,
        previous_close: current / 1.012,
        day_high: current * 1.01,
        day_low: current * 0.99,
    }
}

pub fn snapshot(ticker: &str, current: f64, days: usize) -> StockSnapshot {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
    let historical = (0..days)
        .map(|day| {
            let close = current - days as f64 + day as f64;
            Candle {
                date: start + Days::days(day as i64),
                open: close - 1.0,
                high: close + 2.0,
                low: close - 2.0,
                close,
                volume: 500_000,
            }
        })
        .collect();

    StockSnapshot {
        ticker: ticker.to_string(),
        name: format!("{ticker} Ltd"),
        fetched_at: Utc::now(),
        price: price(ticker, current),
        historical,
        fundamentals: None,
    }
}

/// Data source answering from fixed maps
#[derive(Debug, Default)]
pub struct StaticSource {
    stocks: HashMap<String, StockSnapshot>,
    news: Option<NewsDigest>,
    market: Option<MarketSnapshot>,
    fail_news: bool,
    pub stock_calls: AtomicUsize,
    pub news_calls: AtomicUsize,
    pub market_calls: AtomicUsize,
}

impl StaticSource {
    /// Stock data with 30 days of history for every ticker, plus news and market
    pub fn with_tickers(tickers: &[&str]) -> Self {
        let stocks = tickers
            .iter()
            .enumerate()
            .map(|(idx, ticker)| {
                let current = 100.0 * (idx + 1) as f64;
                ((*ticker).to_string(), snapshot(ticker, current, 30))
            })
            .collect();
        Self {
            stocks,
            news: Some(NewsDigest {
                ticker: tickers.first().map(|t| (*t).to_string()).unwrap_or_default(),
                articles: Vec::new(),
                overall_sentiment: "positive".to_string(),
            }),
            market: Some(MarketSnapshot {
                benchmark_level: 22_000.0,
                benchmark_change_percent: 0.4,
                volatility_index: 13.5,
                market_status: "open".to_string(),
            }),
            ..Self::default()
        }
    }

    pub fn with_stock(mut self, stock: StockSnapshot) -> Self {
        self.stocks.insert(stock.ticker.clone(), stock);
        self
    }

    pub fn failing_news(mut self) -> Self {
        self.fail_news = true;
        self
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSource for StaticSource {
    async fn get_quick_price(&self, ticker: &str) -> Result<Option<PriceSnapshot>> {
        Ok(self.stocks.get(ticker).map(|stock| stock.price.clone()))
    }

    async fn get_stock_data(
        &self,
        ticker: &str,
        historical_days: u32,
    ) -> Result<Option<StockSnapshot>> {
        self.stock_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.stocks.get(ticker).map(|stock| {
            let mut stock = stock.clone();
            stock.historical.truncate(historical_days as usize);
            stock
        }))
    }

    async fn get_news(&self, ticker: &str) -> Result<Option<NewsDigest>> {
        self.news_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_news {
            return Err(StockError::DataUnavailable {
                symbol: ticker.to_string(),
                reason: "news feed down".to_string(),
            });
        }
        Ok(self.news.clone())
    }

    async fn get_market_data(&self) -> Result<Option<MarketSnapshot>> {
        self.market_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.market.clone())
    }
}

/// How a [`StaticProducer`] misbehaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailMode {
    #[default]
    None,
    Error,
    Panic,
    /// Never returns
    Hang,
}

/// Producer returning a fixed score and recording what it was asked
#[derive(Debug)]
pub struct StaticProducer {
    kind: AnalysisKind,
    score: i64,
    signal: Option<&'static str>,
    fail: FailMode,
    pub seen: Mutex<Vec<InputBundle>>,
}

impl StaticProducer {
    pub fn new(kind: AnalysisKind, score: i64) -> Self {
        Self {
            kind,
            score,
            signal: None,
            fail: FailMode::None,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_signal(mut self, signal: &'static str) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn failing(mut self, fail: FailMode) -> Self {
        self.fail = fail;
        self
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().map(|seen| seen.len()).unwrap_or_default()
    }

    /// Detail flags of every call so far
    pub fn detail_modes(&self) -> Vec<bool> {
        self.seen
            .lock()
            .map(|seen| seen.iter().map(|input| input.detail_mode).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AnalysisProducer for StaticProducer {
    fn kind(&self) -> AnalysisKind {
        self.kind
    }

    async fn analyze(&self, input: InputBundle, _ctx: &ExecContext) -> Result<AnalysisReport> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(input);
        }
        match self.fail {
            FailMode::None => {}
            FailMode::Error => {
                return Err(StockError::Producer {
                    producer: self.kind.to_string(),
                    reason: "model unavailable".to_string(),
                });
            }
            FailMode::Panic => panic!("{} producer exploded", self.kind),
            FailMode::Hang => std::future::pending::<()>().await,
        }

        let report = AnalysisReport::new(self.kind, self.score);
        Ok(match self.signal {
            Some(signal) => report.with_signal(signal),
            None => report,
        })
    }
}

/// Comparison producer scoring by the primary side's fundamentals
#[derive(Debug, Default)]
pub struct StaticComparer {
    pub calls: AtomicUsize,
}

#[async_trait]
impl ComparisonProducer for StaticComparer {
    async fn compare(&self, input: ComparisonBundle, _ctx: &ExecContext) -> Result<AnalysisReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let winner = if input.primary.has_analysis() {
            input.primary.ticker
        } else {
            input.secondary.ticker
        };
        Ok(AnalysisReport::new(AnalysisKind::Comparison, 64).with_signal(winner))
    }
}

/// Concrete producers behind a [`ProducerSet`], kept for inspection
pub struct ProducerKit {
    pub fundamental: Arc<StaticProducer>,
    pub technical: Arc<StaticProducer>,
    pub sentiment: Arc<StaticProducer>,
    pub risk: Arc<StaticProducer>,
    pub synthesis: Arc<StaticProducer>,
    pub comparison: Arc<StaticComparer>,
}

impl Default for ProducerKit {
    fn default() -> Self {
        Self {
            fundamental: Arc::new(
                StaticProducer::new(AnalysisKind::Fundamental, 72).with_signal("BUY"),
            ),
            technical: Arc::new(
                StaticProducer::new(AnalysisKind::Technical, 65).with_signal("BULLISH"),
            ),
            sentiment: Arc::new(
                StaticProducer::new(AnalysisKind::Sentiment, 60).with_signal("POSITIVE"),
            ),
            risk: Arc::new(StaticProducer::new(AnalysisKind::Risk, 40)),
            synthesis: Arc::new(StaticProducer::new(AnalysisKind::Synthesis, 70)),
            comparison: Arc::new(StaticComparer::default()),
        }
    }
}

impl ProducerKit {
    pub fn set(&self) -> ProducerSet {
        ProducerSet {
            fundamental: self.fundamental.clone(),
            technical: self.technical.clone(),
            sentiment: self.sentiment.clone(),
            risk: self.risk.clone(),
            synthesis: self.synthesis.clone(),
            comparison: self.comparison.clone(),
        }
    }
}

/// Well-behaved producers
pub fn producers() -> ProducerSet {
    ProducerKit::default().set()
}
