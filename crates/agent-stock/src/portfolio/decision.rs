//! Per-holding action rules
//!
//! The rules form an ordered table; the first rule whose predicate holds
//! decides. Evaluation is a pure function of the holding, its P&L and the
//! two producer scores.

use super::holding::Holding;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Score assumed when a producer gave none
pub const DEFAULT_SCORE: u8 = 50;

/// Recommended action for a holding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortfolioAction {
    Hold,
    AddMore,
    #[serde(rename = "BOOK_PARTIAL_25")]
    BookPartial25,
    #[serde(rename = "BOOK_PARTIAL_50")]
    BookPartial50,
    BookAll,
    StopLossHit,
    /// Bucketed like the others but never produced by the rules
    Rebalance,
    TrailingStop,
}

impl PortfolioAction {
    pub const ALL: [PortfolioAction; 8] = [
        Self::Hold,
        Self::AddMore,
        Self::BookPartial25,
        Self::BookPartial50,
        Self::BookAll,
        Self::StopLossHit,
        Self::Rebalance,
        Self::TrailingStop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hold => "HOLD",
            Self::AddMore => "ADD_MORE",
            Self::BookPartial25 => "BOOK_PARTIAL_25",
            Self::BookPartial50 => "BOOK_PARTIAL_50",
            Self::BookAll => "BOOK_ALL",
            Self::StopLossHit => "STOP_LOSS_HIT",
            Self::Rebalance => "REBALANCE",
            Self::TrailingStop => "TRAILING_STOP",
        }
    }

    /// Actions counted as requiring the holder to act now
    pub fn requires_action(&self) -> bool {
        matches!(self, Self::BookAll | Self::StopLossHit | Self::BookPartial50)
    }
}

impl fmt::Display for PortfolioAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Urgency of a decision, ordered `Low < Medium < High < Urgent`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Urgent => "URGENT",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the rule chain for one holding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDecision {
    pub action: PortfolioAction,
    pub priority: Priority,
    pub reason: String,
    pub notes: Vec<String>,
}

impl ActionDecision {
    fn new(action: PortfolioAction, priority: Priority, reason: impl Into<String>) -> Self {
        Self {
            action,
            priority,
            reason: reason.into(),
            notes: Vec::new(),
        }
    }

    fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

/// Everything a rule looks at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionInput {
    pub current_price: f64,
    pub stop_loss: Option<f64>,
    /// Percent above the stop loss, see [`Holding::stop_loss_distance`]
    pub stop_loss_distance: Option<f64>,
    pub target_price: Option<f64>,
    pub pnl_percent: f64,
    pub fundamental: u8,
    pub technical: u8,
}

impl DecisionInput {
    /// Missing scores default to [`DEFAULT_SCORE`]
    pub fn new(
        holding: &Holding,
        pnl_percent: f64,
        fundamental: Option<u8>,
        technical: Option<u8>,
    ) -> Self {
        Self {
            current_price: holding.current_price(),
            stop_loss: holding.stop_loss(),
            stop_loss_distance: holding.stop_loss_distance(),
            target_price: holding.target_price(),
            pnl_percent,
            fundamental: fundamental.unwrap_or(DEFAULT_SCORE),
            technical: technical.unwrap_or(DEFAULT_SCORE),
        }
    }

    fn scores_note(&self) -> String {
        format!("Fund: {}/100, Tech: {}/100", self.fundamental, self.technical)
    }
}

/// One entry of the rule table
pub struct Rule {
    pub name: &'static str,
    pub applies: fn(&DecisionInput) -> bool,
    pub decide: fn(&DecisionInput) -> ActionDecision,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

/// Rules in evaluation order; [`FALLBACK`] applies when none match
pub static RULES: [Rule; 9] = [
    Rule {
        name: "stop_loss",
        applies: |i| i.stop_loss_distance.is_some_and(|distance| distance <= 2.0),
        decide: |i| {
            let stop = i.stop_loss.unwrap_or_default();
            ActionDecision::new(
                PortfolioAction::StopLossHit,
                Priority::Urgent,
                format!("Price near stop loss (₹{stop})"),
            )
            .note(format!("Current: ₹{:.2}, Stop: ₹{stop:.2}", i.current_price))
        },
    },
    Rule {
        name: "large_loss",
        applies: |i| i.pnl_percent <= -15.0,
        decide: |i| {
            let decision = if i.fundamental < 40 {
                ActionDecision::new(
                    PortfolioAction::BookAll,
                    Priority::Urgent,
                    format!("Large loss ({:.1}%) with weak fundamentals", i.pnl_percent),
                )
            } else {
                ActionDecision::new(
                    PortfolioAction::Hold,
                    Priority::High,
                    format!(
                        "Down {:.1}% but fundamentals intact - hold through volatility",
                        i.pnl_percent
                    ),
                )
            };
            decision.note(format!("Fundamental score: {}/100", i.fundamental))
        },
    },
    Rule {
        name: "target_reached",
        applies: |i| i.target_price.is_some_and(|target| i.current_price >= target),
        decide: |i| {
            ActionDecision::new(
                PortfolioAction::BookPartial50,
                Priority::High,
                format!("Target ₹{} reached", i.target_price.unwrap_or_default()),
            )
            .note("Consider moving to trailing stop")
        },
    },
    Rule {
        name: "large_profit",
        applies: |i| i.pnl_percent >= 25.0,
        decide: |i| {
            let decision = if i.technical < 45 {
                ActionDecision::new(
                    PortfolioAction::BookPartial50,
                    Priority::High,
                    format!("Profit {:.1}% but technicals weakening", i.pnl_percent),
                )
            } else if i.pnl_percent >= 50.0 {
                ActionDecision::new(
                    PortfolioAction::BookPartial25,
                    Priority::Medium,
                    format!("Large profit ({:.1}%) - secure some gains", i.pnl_percent),
                )
            } else {
                ActionDecision::new(
                    PortfolioAction::TrailingStop,
                    Priority::Medium,
                    format!("Good profit ({:.1}%) - use trailing stop", i.pnl_percent),
                )
            };
            decision.note(format!("Technical score: {}/100", i.technical))
        },
    },
    Rule {
        name: "weak_fundamentals",
        applies: |i| i.fundamental < 35,
        decide: |i| {
            ActionDecision::new(
                PortfolioAction::BookAll,
                Priority::High,
                "Fundamentals severely deteriorated",
            )
            .note(format!("Fundamental score dropped to {}/100", i.fundamental))
        },
    },
    Rule {
        name: "technical_breakout",
        applies: |i| i.technical >= 75 && i.pnl_percent < 10.0,
        decide: |i| {
            ActionDecision::new(
                PortfolioAction::AddMore,
                Priority::Medium,
                "Strong technical setup - good to add",
            )
            .note(format!("Technical score: {}/100", i.technical))
            .note(format!("Current P&L: {:.1}%", i.pnl_percent))
        },
    },
    Rule {
        name: "modest_profit",
        applies: |i| (10.0..25.0).contains(&i.pnl_percent),
        decide: |i| {
            let decision = if i.fundamental >= 70 && i.technical >= 65 {
                ActionDecision::new(
                    PortfolioAction::Hold,
                    Priority::Low,
                    format!(
                        "Profit {:.1}% - strong fundamentals & technicals, hold for more",
                        i.pnl_percent
                    ),
                )
            } else {
                ActionDecision::new(
                    PortfolioAction::BookPartial25,
                    Priority::Medium,
                    format!("Profit {:.1}% - secure partial gains", i.pnl_percent),
                )
            };
            decision.note(i.scores_note())
        },
    },
    Rule {
        name: "small_loss",
        applies: |i| i.pnl_percent > -15.0 && i.pnl_percent < 0.0,
        decide: |i| {
            let decision = if i.fundamental >= 70 && i.technical >= 60 {
                ActionDecision::new(
                    PortfolioAction::AddMore,
                    Priority::Medium,
                    format!(
                        "Down {:.1}% but fundamentals strong - buying opportunity",
                        i.pnl_percent
                    ),
                )
            } else {
                ActionDecision::new(
                    PortfolioAction::Hold,
                    Priority::Low,
                    format!("Down {:.1}% - monitor for improvement", i.pnl_percent),
                )
            };
            decision.note(i.scores_note())
        },
    },
    Rule {
        name: "small_profit",
        applies: |i| (0.0..10.0).contains(&i.pnl_percent),
        decide: |i| {
            let reason = if i.fundamental >= 70 && i.technical >= 70 {
                format!("Up {:.1}% with strong outlook - hold for more", i.pnl_percent)
            } else {
                format!("Up {:.1}% - no action needed", i.pnl_percent)
            };
            ActionDecision::new(PortfolioAction::Hold, Priority::Low, reason).note(i.scores_note())
        },
    },
];

pub static FALLBACK: Rule = Rule {
    name: "stable",
    applies: |_| true,
    decide: |i| {
        ActionDecision::new(
            PortfolioAction::Hold,
            Priority::Low,
            "Position stable - continue monitoring",
        )
        .note(i.scores_note())
    },
};

/// First rule whose predicate holds for `input`
pub fn matching_rule(input: &DecisionInput) -> &'static Rule {
    RULES
        .iter()
        .find(|rule| (rule.applies)(input))
        .unwrap_or(&FALLBACK)
}

/// Run the rule chain
pub fn evaluate(input: &DecisionInput) -> ActionDecision {
    (matching_rule(input).decide)(input)
}

/// Decide the action for a holding
///
/// # Example
///
/// ```
/// use agent_stock::portfolio::{decide, Holding, PortfolioAction, Priority};
///
/// let holding = Holding::new("TCS", 10.0, 100.0)?.with_current_price(80.0)?;
/// let decision = decide(&holding, holding.pnl_percent(), Some(30), None);
/// assert_eq!(decision.action, PortfolioAction::BookAll);
/// assert_eq!(decision.priority, Priority::Urgent);
/// # Ok::<(), agent_stock::StockError>(())
/// ```
pub fn decide(
    holding: &Holding,
    pnl_percent: f64,
    fundamental: Option<u8>,
    technical: Option<u8>,
) -> ActionDecision {
    evaluate(&DecisionInput::new(holding, pnl_percent, fundamental, technical))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(pnl_percent: f64, fundamental: u8, technical: u8) -> DecisionInput {
        DecisionInput {
            current_price: 100.0,
            stop_loss: None,
            stop_loss_distance: None,
            target_price: None,
            pnl_percent,
            fundamental,
            technical,
        }
    }

    fn holding(avg: f64, current: f64) -> Holding {
        Holding::new("TCS", 10.0, avg)
            .unwrap()
            .with_current_price(current)
            .unwrap()
    }

    #[test]
    fn test_profit_with_weak_technicals() {
        let holding = holding(100.0, 126.0);
        let decision = decide(&holding, holding.pnl_percent(), None, Some(40));

        assert_eq!(decision.action, PortfolioAction::BookPartial50);
        assert_eq!(decision.priority, Priority::High);
        assert_eq!(decision.reason, "Profit 26.0% but technicals weakening");
        assert_eq!(decision.notes, ["Technical score: 40/100"]);
    }

    #[test]
    fn test_large_loss_with_weak_fundamentals() {
        let holding = holding(100.0, 80.0);
        let decision = decide(&holding, holding.pnl_percent(), Some(30), None);

        assert_eq!(decision.action, PortfolioAction::BookAll);
        assert_eq!(decision.priority, Priority::Urgent);
    }

    #[test]
    fn test_stop_loss_beats_large_profit() {
        let holding = holding(100.0, 130.0).with_stop_loss(128.0).unwrap();
        let input = DecisionInput::new(&holding, holding.pnl_percent(), None, Some(40));

        assert!((RULES[3].applies)(&input));
        assert_eq!(matching_rule(&input).name, "stop_loss");
        let decision = evaluate(&input);
        assert_eq!(decision.action, PortfolioAction::StopLossHit);
        assert_eq!(decision.priority, Priority::Urgent);
        assert_eq!(decision.notes, ["Current: ₹130.00, Stop: ₹128.00"]);
    }

    #[test]
    fn test_each_rule_in_isolation() {
        let cases = [
            (input(-20.0, 60, 50), "large_loss", PortfolioAction::Hold, Priority::High),
            (input(30.0, 60, 50), "large_profit", PortfolioAction::TrailingStop, Priority::Medium),
            (input(60.0, 60, 50), "large_profit", PortfolioAction::BookPartial25, Priority::Medium),
            (input(5.0, 30, 50), "weak_fundamentals", PortfolioAction::BookAll, Priority::High),
            (input(5.0, 60, 80), "technical_breakout", PortfolioAction::AddMore, Priority::Medium),
            (input(15.0, 75, 70), "modest_profit", PortfolioAction::Hold, Priority::Low),
            (input(15.0, 60, 70), "modest_profit", PortfolioAction::BookPartial25, Priority::Medium),
            (input(-5.0, 75, 65), "small_loss", PortfolioAction::AddMore, Priority::Medium),
            (input(-5.0, 50, 50), "small_loss", PortfolioAction::Hold, Priority::Low),
            (input(5.0, 50, 50), "small_profit", PortfolioAction::Hold, Priority::Low),
        ];

        for (input, rule, action, priority) in cases {
            assert_eq!(matching_rule(&input).name, rule, "{input:?}");
            let decision = evaluate(&input);
            assert_eq!((decision.action, decision.priority), (action, priority), "{input:?}");
            assert!(!decision.notes.is_empty());
        }
    }

    #[test]
    fn test_target_reached() {
        let mut input = input(5.0, 50, 50);
        input.target_price = Some(95.0);
        assert_eq!(matching_rule(&input).name, "target_reached");
        assert_eq!(evaluate(&input).action, PortfolioAction::BookPartial50);
    }

    #[test]
    fn test_small_profit_ignores_scores() {
        let strong = evaluate(&input(5.0, 90, 70));
        let weak = evaluate(&input(5.0, 36, 20));
        assert_eq!(strong.action, weak.action);
        assert_eq!(strong.priority, weak.priority);
        assert_eq!(strong.reason, "Up 5.0% with strong outlook - hold for more");
        assert_eq!(weak.reason, "Up 5.0% - no action needed");
        assert_eq!(weak.notes, ["Fund: 36/100, Tech: 20/100"]);
    }

    #[test]
    fn test_stop_loss_hit_in_small_profit() {
        let holding = holding(100.0, 101.0).with_stop_loss(100.0).unwrap();
        let pnl = holding.pnl_percent();
        assert!((pnl - 1.0).abs() < 1e-9);

        let decision = decide(&holding, pnl, None, None);
        assert_eq!(decision.action, PortfolioAction::StopLossHit);
        assert_eq!(decision.priority, Priority::Urgent);
    }

    #[test]
    fn test_stop_loss_not_hit_above_threshold() {
        let holding = holding(100.0, 103.0).with_stop_loss(100.0).unwrap();
        let input = DecisionInput::new(&holding, holding.pnl_percent(), None, None);
        assert_eq!(matching_rule(&input).name, "small_profit");
    }

    #[test]
    fn test_fallback_for_nan_pnl() {
        let input = input(f64::NAN, 50, 50);
        assert_eq!(matching_rule(&input).name, FALLBACK.name);
        assert_eq!(evaluate(&input).reason, "Position stable - continue monitoring");
    }

    #[test]
    fn test_missing_scores_default_to_neutral() {
        let input = DecisionInput::new(&holding(100.0, 100.0), 0.0, None, None);
        assert_eq!((input.fundamental, input.technical), (DEFAULT_SCORE, DEFAULT_SCORE));
    }

    #[test]
    fn test_priority_order() {
        assert!(Priority::Urgent > Priority::High);
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }

    #[test]
    fn test_action_wire_names() {
        assert_eq!(
            serde_json::to_string(&PortfolioAction::BookPartial25).unwrap(),
            r#""BOOK_PARTIAL_25""#
        );
        assert_eq!(
            serde_json::to_string(&PortfolioAction::StopLossHit).unwrap(),
            r#""STOP_LOSS_HIT""#
        );
        for action in PortfolioAction::ALL {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{action}\""));
        }
    }
}
