//! Weighted score synthesis
//!
//! Combines the four component scores into one weighted score, detects
//! disagreement between the categorical signals and adjusts the result
//! accordingly. The synthesizer never picks a BUY/HOLD label itself; the
//! narrative producer consumes the [`WeightedScoreResult`].

use crate::agents::{AnalysisKind, AnalysisReport};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Score assumed for a missing component
pub const DEFAULT_SCORE: u8 = 50;
/// Adjustment applied when every signal agrees
pub const AGREEMENT_BONUS: i32 = 10;
/// Adjustment applied when bullish and bearish signals coexist
pub const CONFLICT_PENALTY: i32 = -20;

const BULLISH_LABELS: [&str; 5] = ["STRONG_BUY", "BUY", "BULLISH", "POSITIVE", "UNDERVALUED"];
const BEARISH_LABELS: [&str; 5] = ["STRONG_SELL", "SELL", "BEARISH", "NEGATIVE", "OVERVALUED"];

/// Investment horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Horizon {
    Short,
    /// Medium term or swing trading
    Medium,
    Long,
}

impl Horizon {
    /// Parse free text; "long" wins over "short", anything else is medium
    pub fn parse(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("long") {
            Self::Long
        } else if lower.contains("short") {
            Self::Short
        } else {
            Self::Medium
        }
    }

    pub fn weights(&self) -> Weights {
        match self {
            Self::Long => Weights::LONG,
            Self::Short => Weights::SHORT,
            Self::Medium => Weights::MEDIUM,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Component weights, summing to 1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub fundamental: f64,
    pub technical: f64,
    pub sentiment: f64,
    pub risk: f64,
}

impl Weights {
    pub const LONG: Self = Self {
        fundamental: 0.50,
        technical: 0.20,
        sentiment: 0.20,
        risk: 0.10,
    };

    pub const SHORT: Self = Self {
        fundamental: 0.15,
        technical: 0.50,
        sentiment: 0.25,
        risk: 0.10,
    };

    pub const MEDIUM: Self = Self {
        fundamental: 0.30,
        technical: 0.40,
        sentiment: 0.20,
        risk: 0.10,
    };

    pub fn sum(&self) -> f64 {
        self.fundamental + self.technical + self.sentiment + self.risk
    }
}

/// Direction of a categorical label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    Bullish,
    Bearish,
    Neutral,
}

impl Signal {
    /// Classify a label by upper-case substring match, bullish first
    pub fn normalize(label: &str) -> Self {
        let upper = label.to_uppercase();
        if BULLISH_LABELS.iter().any(|l| upper.contains(l)) {
            Self::Bullish
        } else if BEARISH_LABELS.iter().any(|l| upper.contains(l)) {
            Self::Bearish
        } else {
            Self::Neutral
        }
    }
}

/// Bullish and bearish signals seen together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalConflict {
    pub bullish_count: usize,
    pub bearish_count: usize,
    pub message: String,
}

/// Report the conflict between `signals`, if any
pub fn detect_conflicts(signals: &[Signal]) -> Vec<SignalConflict> {
    let bullish_count = signals.iter().filter(|s| **s == Signal::Bullish).count();
    let bearish_count = signals.iter().filter(|s| **s == Signal::Bearish).count();

    if bullish_count > 0 && bearish_count > 0 {
        vec![SignalConflict {
            bullish_count,
            bearish_count,
            message: format!("Mixed signals: {bullish_count} bullish, {bearish_count} bearish"),
        }]
    } else {
        Vec::new()
    }
}

/// Raw synthesizer inputs; `None` means the component is unavailable
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreInputs {
    pub fundamental_score: Option<u8>,
    pub technical_score: Option<u8>,
    pub sentiment_score: Option<u8>,
    /// Higher is riskier
    pub risk_score: Option<u8>,
    pub fundamental_rating: Option<String>,
    pub technical_signal: Option<String>,
    pub sentiment_label: Option<String>,
}

impl ScoreInputs {
    /// Collect inputs from whichever producer reports are available
    pub fn from_reports<'a>(reports: impl IntoIterator<Item = &'a AnalysisReport>) -> Self {
        let mut inputs = Self::default();
        for report in reports {
            let score = Some(report.score());
            let signal = report.signal.clone();
            match report.kind {
                AnalysisKind::Fundamental => {
                    inputs.fundamental_score = score;
                    inputs.fundamental_rating = signal;
                }
                AnalysisKind::Technical => {
                    inputs.technical_score = score;
                    inputs.technical_signal = signal;
                }
                AnalysisKind::Sentiment => {
                    inputs.sentiment_score = score;
                    inputs.sentiment_label = signal;
                }
                AnalysisKind::Risk => inputs.risk_score = score,
                AnalysisKind::Synthesis | AnalysisKind::Comparison => {}
            }
        }
        inputs
    }
}

/// Outcome of score synthesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedScoreResult {
    pub horizon: Horizon,
    pub fundamental_score: u8,
    pub technical_score: u8,
    pub sentiment_score: u8,
    /// Raw risk score, before inversion
    pub risk_score: u8,
    pub weights: Weights,
    pub signals: [Signal; 3],
    pub weighted_average: f64,
    pub conflicts: Vec<SignalConflict>,
    pub confidence_adjustment: i32,
    /// Not clamped: may fall below 0 or exceed 100
    pub final_score: f64,
}

impl WeightedScoreResult {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Weight, check for conflicts and adjust
///
/// # Example
///
/// ```
/// use agent_stock::synthesis::{synthesize, Horizon, ScoreInputs};
///
/// let result = synthesize(&ScoreInputs::default(), Horizon::Medium);
/// assert_eq!(result.weighted_average, 50.0);
/// assert_eq!(result.final_score, 60.0);
/// ```
pub fn synthesize(inputs: &ScoreInputs, horizon: Horizon) -> WeightedScoreResult {
    let weights = horizon.weights();
    let fundamental_score = inputs.fundamental_score.unwrap_or(DEFAULT_SCORE);
    let technical_score = inputs.technical_score.unwrap_or(DEFAULT_SCORE);
    let sentiment_score = inputs.sentiment_score.unwrap_or(DEFAULT_SCORE);
    let risk_score = inputs.risk_score.unwrap_or(DEFAULT_SCORE);

    let weighted = f64::from(fundamental_score) * weights.fundamental
        + f64::from(technical_score) * weights.technical
        + f64::from(sentiment_score) * weights.sentiment
        + f64::from(100 - risk_score.min(100)) * weights.risk;

    let signals = [
        Signal::normalize(inputs.fundamental_rating.as_deref().unwrap_or("HOLD")),
        Signal::normalize(inputs.technical_signal.as_deref().unwrap_or("NEUTRAL")),
        Signal::normalize(inputs.sentiment_label.as_deref().unwrap_or("NEUTRAL")),
    ];
    let conflicts = detect_conflicts(&signals);
    let confidence_adjustment = if conflicts.is_empty() {
        AGREEMENT_BONUS
    } else {
        CONFLICT_PENALTY
    };

    WeightedScoreResult {
        horizon,
        fundamental_score,
        technical_score,
        sentiment_score,
        risk_score,
        weights,
        signals,
        weighted_average: round2(weighted),
        conflicts,
        confidence_adjustment,
        final_score: round2(weighted + f64::from(confidence_adjustment)),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn inputs(scores: [u8; 4], labels: [&str; 3]) -> ScoreInputs {
        ScoreInputs {
            fundamental_score: Some(scores[0]),
            technical_score: Some(scores[1]),
            sentiment_score: Some(scores[2]),
            risk_score: Some(scores[3]),
            fundamental_rating: Some(labels[0].to_string()),
            technical_signal: Some(labels[1].to_string()),
            sentiment_label: Some(labels[2].to_string()),
        }
    }

    #[test]
    fn test_horizon_parse() {
        assert_eq!(Horizon::parse("Long term"), Horizon::Long);
        assert_eq!(Horizon::parse("SHORT"), Horizon::Short);
        assert_eq!(Horizon::parse("swing"), Horizon::Medium);
        assert_eq!(Horizon::parse(""), Horizon::Medium);
        assert_eq!(Horizon::parse("short or long"), Horizon::Long);
    }

    #[test]
    fn test_signal_normalize() {
        assert_eq!(Signal::normalize("strong_buy"), Signal::Bullish);
        assert_eq!(Signal::normalize("Undervalued"), Signal::Bullish);
        assert_eq!(Signal::normalize("SELL"), Signal::Bearish);
        assert_eq!(Signal::normalize("negative"), Signal::Bearish);
        assert_eq!(Signal::normalize("HOLD"), Signal::Neutral);
        assert_eq!(Signal::normalize("FAIRLY_VALUED"), Signal::Neutral);
    }

    #[test]
    fn test_defaults_when_everything_missing() {
        let result = synthesize(&ScoreInputs::default(), Horizon::Medium);
        assert_eq!(result.fundamental_score, 50);
        assert_eq!(result.risk_score, 50);
        assert_eq!(result.signals, [Signal::Neutral; 3]);
        assert!(!result.has_conflicts());
        assert_eq!(result.confidence_adjustment, AGREEMENT_BONUS);
        assert!((result.final_score - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_risk_is_inverted() {
        let low_risk = synthesize(&inputs([50, 50, 50, 0], ["HOLD"; 3]), Horizon::Medium);
        let high_risk = synthesize(&inputs([50, 50, 50, 100], ["HOLD"; 3]), Horizon::Medium);
        assert!((low_risk.weighted_average - 55.0).abs() < 1e-9);
        assert!((high_risk.weighted_average - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_conflict_applies_penalty() {
        let result = synthesize(&inputs([80, 40, 60, 30], ["BUY", "SELL", "NEUTRAL"]), Horizon::Medium);
        // 80*.3 + 40*.4 + 60*.2 + 70*.1
        assert!((result.weighted_average - 59.0).abs() < 1e-9);
        assert_eq!(result.confidence_adjustment, CONFLICT_PENALTY);
        assert!((result.final_score - 39.0).abs() < 1e-9);
        assert_eq!(
            result.conflicts,
            vec![SignalConflict {
                bullish_count: 1,
                bearish_count: 1,
                message: "Mixed signals: 1 bullish, 1 bearish".to_string(),
            }]
        );
    }

    #[test]
    fn test_conflict_matrix() {
        let cases = [
            (["BUY", "BULLISH", "POSITIVE"], AGREEMENT_BONUS),
            (["SELL", "BEARISH", "NEGATIVE"], AGREEMENT_BONUS),
            (["BUY", "NEUTRAL", "NEUTRAL"], AGREEMENT_BONUS),
            (["HOLD", "NEUTRAL", "NEGATIVE"], AGREEMENT_BONUS),
            (["UNDERVALUED", "NEUTRAL", "NEGATIVE"], CONFLICT_PENALTY),
            (["OVERVALUED", "STRONG_BUY", "NEUTRAL"], CONFLICT_PENALTY),
            (["BUY", "BUY", "NEGATIVE"], CONFLICT_PENALTY),
        ];
        for (labels, expected) in cases {
            let result = synthesize(&inputs([50; 4], labels), Horizon::Long);
            assert_eq!(result.confidence_adjustment, expected, "{labels:?}");
        }
    }

    #[test]
    fn test_final_score_not_clamped() {
        let high = synthesize(&inputs([100, 100, 100, 0], ["BUY"; 3]), Horizon::Short);
        assert!((high.final_score - 110.0).abs() < 1e-9);

        let low = synthesize(&inputs([0, 0, 0, 100], ["BUY", "SELL", "SELL"]), Horizon::Short);
        assert!((low.final_score + 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_reports() {
        let reports = [
            AnalysisReport::new(AnalysisKind::Fundamental, 72).with_signal("BUY"),
            AnalysisReport::new(AnalysisKind::Risk, 35),
        ];
        let inputs = ScoreInputs::from_reports(&reports);
        assert_eq!(inputs.fundamental_score, Some(72));
        assert_eq!(inputs.fundamental_rating.as_deref(), Some("BUY"));
        assert_eq!(inputs.risk_score, Some(35));
        assert_eq!(inputs.technical_score, None);
    }

    proptest! {
        #[test]
        fn weights_sum_to_one_for_any_horizon(text in ".*") {
            let weights = Horizon::parse(&text).weights();
            prop_assert!((weights.sum() - 1.0).abs() < 1e-9);
        }

        #[test]
        fn weighted_average_stays_in_range(
            f in 0u8..=100, t in 0u8..=100, s in 0u8..=100, r in 0u8..=100, text in ".*"
        ) {
            let result = synthesize(&inputs([f, t, s, r], ["HOLD"; 3]), Horizon::parse(&text));
            prop_assert!((0.0..=100.0).contains(&result.weighted_average));
        }
    }
}
