//! Classified user intents
//!
//! Classification itself happens upstream (chat commands, an LLM, ...).
//! This module only holds the result so it can be routed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum number of tickers an intent carries
pub const MAX_TICKERS: usize = 2;

/// Kind of request the user made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    /// Current price only
    PriceCheck,
    TechnicalAnalysis,
    FundamentalAnalysis,
    /// News and market sentiment
    SentimentAnalysis,
    /// All producers plus synthesis
    FullAnalysis,
    /// Two tickers side by side
    Comparison,
    /// Full analysis with detailed producer output
    DeepDive,
    Help,
    Unknown,
}

impl IntentKind {
    pub const ALL: [IntentKind; 9] = [
        Self::PriceCheck,
        Self::TechnicalAnalysis,
        Self::FundamentalAnalysis,
        Self::SentimentAnalysis,
        Self::FullAnalysis,
        Self::Comparison,
        Self::DeepDive,
        Self::Help,
        Self::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PriceCheck => "price_check",
            Self::TechnicalAnalysis => "technical_analysis",
            Self::FundamentalAnalysis => "fundamental_analysis",
            Self::SentimentAnalysis => "sentiment_analysis",
            Self::FullAnalysis => "full_analysis",
            Self::Comparison => "comparison",
            Self::DeepDive => "deep_dive",
            Self::Help => "help",
            Self::Unknown => "unknown",
        }
    }

    /// Analysis aspect for single-aspect kinds
    pub fn aspect(&self) -> Option<&'static str> {
        match self {
            Self::TechnicalAnalysis => Some("technical"),
            Self::FundamentalAnalysis => Some("fundamental"),
            Self::SentimentAnalysis => Some("sentiment"),
            _ => None,
        }
    }

    /// Whether this kind runs the full producer set with detailed output
    pub fn is_detailed(&self) -> bool {
        matches!(self, Self::DeepDive)
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("unknown intent kind: {s}"))
    }
}

/// A classified request, immutable once built
///
/// # Example
///
/// ```
/// use agent_stock::intent::{Intent, IntentKind};
///
/// let intent = Intent::new(IntentKind::Comparison, ["tcs", " infy ", "wipro"], 1.4);
/// assert_eq!(intent.tickers(), ["TCS", "INFY"]);
/// assert_eq!(intent.confidence(), 1.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawIntent")]
pub struct Intent {
    kind: IntentKind,
    tickers: Vec<String>,
    aspect: Option<String>,
    confidence: f64,
}

/// Unchecked wire form of [`Intent`]
#[derive(Debug, Deserialize)]
struct RawIntent {
    kind: IntentKind,
    #[serde(default)]
    tickers: Vec<String>,
    #[serde(default)]
    aspect: Option<String>,
    #[serde(default = "full_confidence")]
    confidence: f64,
}

fn full_confidence() -> f64 {
    1.0
}

impl From<RawIntent> for Intent {
    fn from(raw: RawIntent) -> Self {
        let intent = Intent::new(raw.kind, raw.tickers, raw.confidence);
        match raw.aspect {
            Some(aspect) => intent.with_aspect(aspect),
            None => intent,
        }
    }
}

impl Intent {
    /// Build an intent, normalizing tickers to upper case and keeping at
    /// most two of them, and clamping confidence to `[0, 1]`
    pub fn new<I, T>(kind: IntentKind, tickers: I, confidence: f64) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let tickers = tickers
            .into_iter()
            .map(|t| t.as_ref().trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .take(MAX_TICKERS)
            .collect();
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };

        Self {
            kind,
            tickers,
            aspect: kind.aspect().map(str::to_string),
            confidence,
        }
    }

    /// Intent with full confidence
    pub fn certain<I, T>(kind: IntentKind, tickers: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        Self::new(kind, tickers, 1.0)
    }

    /// Override the aspect derived from the kind
    pub fn with_aspect(mut self, aspect: impl Into<String>) -> Self {
        self.aspect = Some(aspect.into());
        self
    }

    pub fn kind(&self) -> IntentKind {
        self.kind
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn primary_ticker(&self) -> Option<&str> {
        self.tickers.first().map(String::as_str)
    }

    pub fn secondary_ticker(&self) -> Option<&str> {
        self.tickers.get(1).map(String::as_str)
    }

    pub fn aspect(&self) -> Option<&str> {
        self.aspect.as_deref()
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tickers_normalized_and_truncated() {
        let intent = Intent::new(IntentKind::FullAnalysis, ["reliance", "", "tcs", "infy"], 0.9);
        assert_eq!(intent.tickers(), ["RELIANCE", "TCS"]);
        assert_eq!(intent.primary_ticker(), Some("RELIANCE"));
        assert_eq!(intent.secondary_ticker(), Some("TCS"));
    }

    #[test]
    fn test_confidence_clamped() {
        let none: [&str; 0] = [];
        assert_eq!(Intent::new(IntentKind::Help, none, -3.0).confidence(), 0.0);
        assert_eq!(Intent::new(IntentKind::Help, none, 7.0).confidence(), 1.0);
        assert_eq!(Intent::new(IntentKind::Help, none, f64::NAN).confidence(), 0.0);
        assert!((Intent::new(IntentKind::Help, none, 0.42).confidence() - 0.42).abs() < f64::EPSILON);
    }

    #[test]
    fn test_aspect_defaults_from_kind() {
        let intent = Intent::certain(IntentKind::SentimentAnalysis, ["TCS"]);
        assert_eq!(intent.aspect(), Some("sentiment"));

        let intent = Intent::certain(IntentKind::FullAnalysis, ["TCS"]);
        assert_eq!(intent.aspect(), None);

        let intent = intent.with_aspect("valuation");
        assert_eq!(intent.aspect(), Some("valuation"));
    }

    #[test]
    fn test_only_deep_dive_is_detailed() {
        let detailed: Vec<_> = IntentKind::ALL.into_iter().filter(IntentKind::is_detailed).collect();
        assert_eq!(detailed, vec![IntentKind::DeepDive]);
    }

    #[test]
    fn test_kind_parse() {
        for kind in IntentKind::ALL {
            assert_eq!(kind.as_str().parse::<IntentKind>(), Ok(kind));
        }
        assert_eq!("Deep-Dive".parse::<IntentKind>(), Ok(IntentKind::DeepDive));
        assert!("portfolio".parse::<IntentKind>().is_err());
    }

    #[test]
    fn test_deserialize_normalizes() {
        let intent: Intent = serde_json::from_str(
            r#"{"kind":"comparison","tickers":["tcs"," TCS ","infy"],"aspect":null,"confidence":7.5}"#,
        )
        .unwrap();
        assert_eq!(intent.tickers(), ["TCS", "TCS"]);
        assert_eq!(intent.confidence(), 1.0);

        let intent: Intent =
            serde_json::from_str(r#"{"kind":"technical_analysis","tickers":["wipro"]}"#).unwrap();
        assert_eq!(intent, Intent::certain(IntentKind::TechnicalAnalysis, ["WIPRO"]));
        assert_eq!(intent.aspect(), Some("technical"));
    }

    #[test]
    fn test_kind_serde_matches_as_str() {
        let json = serde_json::to_string(&IntentKind::PriceCheck).unwrap();
        assert_eq!(json, "\"price_check\"");
    }
}
