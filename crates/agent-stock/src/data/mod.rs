//! Market data model and the data source contract
//!
//! The pipeline never talks to a provider directly. Everything goes through
//! [`DataSource`], where `Ok(None)` means the data is legitimately missing
//! and `Err` means the call itself failed.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Latest quote for a ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub ticker: String,
    pub current_price: f64,
    pub change_percent: f64,
    #[serde(default)]
    pub change_absolute: f64,
    #[serde(default)]
    pub volume: u64,
    #[serde(default)]
    pub previous_close: f64,
    #[serde(default)]
    pub day_high: f64,
    #[serde(default)]
    pub day_low: f64,
}

/// One OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Quote, history and fundamentals for one ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub ticker: String,
    #[serde(default)]
    pub name: String,
    pub fetched_at: DateTime<Utc>,
    pub price: PriceSnapshot,
    #[serde(default)]
    pub historical: Vec<Candle>,
    /// Provider-specific fundamentals (ratios, margins, ownership, ...)
    #[serde(default)]
    pub fundamentals: Option<serde_json::Value>,
}

impl StockSnapshot {
    /// Whether the snapshot carries a usable price
    pub fn is_valid(&self) -> bool {
        self.price.current_price > 0.0
    }

    pub fn current_price(&self) -> f64 {
        self.price.current_price
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub source: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: Option<String>,
    /// "positive", "negative" or "neutral" when the provider tags it
    #[serde(default)]
    pub sentiment: Option<String>,
}

/// Recent news for a ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsDigest {
    pub ticker: String,
    #[serde(default)]
    pub articles: Vec<NewsArticle>,
    #[serde(default = "neutral")]
    pub overall_sentiment: String,
}

fn neutral() -> String {
    "neutral".to_string()
}

/// Broad market conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub benchmark_level: f64,
    pub benchmark_change_percent: f64,
    #[serde(default)]
    pub volatility_index: f64,
    #[serde(default)]
    pub market_status: String,
}

/// Provider of market data
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Quote only, for the fast path
    async fn get_quick_price(&self, ticker: &str) -> Result<Option<PriceSnapshot>>;

    /// Quote with `historical_days` of history and fundamentals
    async fn get_stock_data(
        &self,
        ticker: &str,
        historical_days: u32,
    ) -> Result<Option<StockSnapshot>>;

    async fn get_news(&self, ticker: &str) -> Result<Option<NewsDigest>>;

    async fn get_market_data(&self) -> Result<Option<MarketSnapshot>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_validity() {
        let mut snapshot: StockSnapshot = serde_json::from_value(serde_json::json!({
            "ticker": "TCS",
            "fetched_at": "2026-01-05T09:15:00Z",
            "price": { "ticker": "TCS", "current_price": 3900.5, "change_percent": 1.2 }
        }))
        .unwrap();

        assert!(snapshot.is_valid());
        assert!(snapshot.historical.is_empty());
        assert!(snapshot.fundamentals.is_none());

        snapshot.price.current_price = 0.0;
        assert!(!snapshot.is_valid());
    }

    #[test]
    fn test_news_defaults() {
        let digest: NewsDigest =
            serde_json::from_value(serde_json::json!({ "ticker": "INFY" })).unwrap();
        assert_eq!(digest.overall_sentiment, "neutral");
        assert!(digest.articles.is_empty());
    }
}
