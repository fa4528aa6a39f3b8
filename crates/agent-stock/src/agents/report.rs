//! Producer output

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Score used by fallback reports
pub const NEUTRAL_SCORE: u8 = 50;

/// Which producer wrote a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    Fundamental,
    Technical,
    /// News and market sentiment
    Sentiment,
    /// Score is a risk score: higher means riskier
    Risk,
    /// Narrative recommendation over the weighted scores
    Synthesis,
    Comparison,
}

impl AnalysisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fundamental => "fundamental",
            Self::Technical => "technical",
            Self::Sentiment => "sentiment",
            Self::Risk => "risk",
            Self::Synthesis => "synthesis",
            Self::Comparison => "comparison",
        }
    }

    /// JSON keys carrying the categorical label for this kind, by preference
    fn signal_keys(&self) -> &'static [&'static str] {
        match self {
            Self::Fundamental => &["rating", "recommendation"],
            Self::Technical => &["signal"],
            Self::Sentiment => &["overall_sentiment", "sentiment"],
            Self::Risk => &["risk_rating", "risk_level"],
            Self::Synthesis => &["recommendation", "primary_action"],
            Self::Comparison => &["winner", "recommendation"],
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    #[default]
    Low,
    Medium,
    High,
}

impl Confidence {
    fn parse(text: &str) -> Option<Self> {
        match text.trim().to_uppercase().as_str() {
            "LOW" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            _ => None,
        }
    }
}

/// Result of one producer call
///
/// The score is always within `[0, 100]`; every constructor clamps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub kind: AnalysisKind,
    #[serde(deserialize_with = "clamped_score")]
    score: u8,
    /// Categorical label: rating, signal, sentiment or risk rating
    pub signal: Option<String>,
    #[serde(default)]
    pub confidence: Confidence,
    /// Producer-specific structured output
    #[serde(default)]
    pub detail: Value,
    /// Set when the producer degraded to a neutral answer
    #[serde(default)]
    pub fallback_reason: Option<String>,
}

impl AnalysisReport {
    /// Create a report, clamping `score` into `[0, 100]`
    pub fn new(kind: AnalysisKind, score: i64) -> Self {
        Self {
            kind,
            score: score.clamp(0, 100) as u8,
            signal: None,
            confidence: Confidence::Medium,
            detail: Value::Null,
            fallback_reason: None,
        }
    }

    /// Neutral fallback report used when a producer cannot answer
    pub fn neutral(kind: AnalysisKind, reason: impl Into<String>) -> Self {
        Self {
            confidence: Confidence::Low,
            fallback_reason: Some(reason.into()),
            ..Self::new(kind, i64::from(NEUTRAL_SCORE))
        }
    }

    /// Build a report from loosely structured producer JSON
    ///
    /// Reads `score` (or `risk_score`), the kind's label key, `confidence`
    /// and `error`. A missing score falls back to neutral; the whole value
    /// is kept as `detail`.
    pub fn from_json(kind: AnalysisKind, value: Value) -> Self {
        let score = ["score", "risk_score"]
            .iter()
            .find_map(|key| value.get(key).and_then(Value::as_f64))
            .map_or(i64::from(NEUTRAL_SCORE), |s| s.round() as i64);
        let signal = kind
            .signal_keys()
            .iter()
            .find_map(|key| value.get(key).and_then(Value::as_str))
            .map(str::to_string);
        let confidence = value
            .get("confidence")
            .and_then(Value::as_str)
            .and_then(Confidence::parse)
            .unwrap_or_default();
        let fallback_reason = value
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            kind,
            score: score.clamp(0, 100) as u8,
            signal,
            confidence,
            detail: value,
            fallback_reason,
        }
    }

    pub fn with_signal(mut self, signal: impl Into<String>) -> Self {
        self.signal = Some(signal.into());
        self
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = detail;
        self
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

fn clamped_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let raw = f64::deserialize(deserializer)?;
    if raw.is_nan() {
        return Ok(NEUTRAL_SCORE);
    }
    Ok(raw.round().clamp(0.0, 100.0) as u8)
}
