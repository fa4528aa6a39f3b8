//! Producer inputs

use super::report::{AnalysisKind, AnalysisReport};
use crate::data::{MarketSnapshot, NewsDigest, StockSnapshot};
use crate::synthesis::WeightedScoreResult;
use std::sync::Arc;

/// Everything a producer may read for one ticker
#[derive(Debug, Clone, Default)]
pub struct InputBundle {
    pub ticker: String,
    /// Ask for the detailed variant of the analysis
    pub detail_mode: bool,
    pub time_horizon: String,
    pub stock_data: Option<Arc<StockSnapshot>>,
    pub news: Option<Arc<NewsDigest>>,
    pub market: Option<Arc<MarketSnapshot>>,
    /// Reports of producers this one depends on
    pub upstream: Vec<AnalysisReport>,
    /// Set for the synthesis producer only
    pub weighted_scores: Option<WeightedScoreResult>,
}

impl InputBundle {
    /// Create a bundle for a ticker
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            ..Self::default()
        }
    }

    // =========== Builder Methods ===========

    pub fn with_detail_mode(mut self, detail_mode: bool) -> Self {
        self.detail_mode = detail_mode;
        self
    }

    pub fn with_time_horizon(mut self, horizon: impl Into<String>) -> Self {
        self.time_horizon = horizon.into();
        self
    }

    pub fn with_stock_data(mut self, data: Option<Arc<StockSnapshot>>) -> Self {
        self.stock_data = data;
        self
    }

    pub fn with_news(mut self, news: Option<Arc<NewsDigest>>) -> Self {
        self.news = news;
        self
    }

    pub fn with_market(mut self, market: Option<Arc<MarketSnapshot>>) -> Self {
        self.market = market;
        self
    }

    /// Append an upstream report, if present
    pub fn with_upstream(mut self, report: Option<&AnalysisReport>) -> Self {
        if let Some(report) = report {
            self.upstream.push(report.clone());
        }
        self
    }

    pub fn with_weighted_scores(mut self, scores: WeightedScoreResult) -> Self {
        self.weighted_scores = Some(scores);
        self
    }

    // =========== Accessors ===========

    /// First upstream report of the given kind
    pub fn upstream_report(&self, kind: AnalysisKind) -> Option<&AnalysisReport> {
        self.upstream.iter().find(|report| report.kind == kind)
    }
}

/// One side of a comparison
#[derive(Debug, Clone, Default)]
pub struct CompareSide {
    pub ticker: String,
    pub stock_data: Option<Arc<StockSnapshot>>,
    pub fundamental: Option<AnalysisReport>,
    pub technical: Option<AnalysisReport>,
}

impl CompareSide {
    /// Whether anything beyond the ticker is known
    pub fn has_analysis(&self) -> bool {
        self.fundamental.is_some() || self.technical.is_some()
    }
}

/// Input of the comparison producer
#[derive(Debug, Clone, Default)]
pub struct ComparisonBundle {
    pub primary: CompareSide,
    pub secondary: CompareSide,
    pub detail_mode: bool,
}
