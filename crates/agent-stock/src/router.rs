//! Intent router
//!
//! Binds a classified [`Intent`] to one of the pre-built execution paths and
//! validates it before any data is fetched. Routing is a pure function of the
//! intent: no I/O, no state.

use crate::intent::{Intent, IntentKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Pipeline shape selected for an intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPath {
    /// Price lookup only, no producers
    Fast,
    /// One data collection stage and one producer
    Single,
    /// Collection, three parallel producers, risk, synthesis
    Standard,
    /// Two tickers collected and analyzed in parallel, then compared
    Comparison,
    /// Standard shape with detailed producer output
    DeepDive,
}

impl ExecutionPath {
    pub const ALL: [ExecutionPath; 5] = [
        Self::Fast,
        Self::Single,
        Self::Standard,
        Self::Comparison,
        Self::DeepDive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Single => "single",
            Self::Standard => "standard",
            Self::Comparison => "comparison",
            Self::DeepDive => "deep_dive",
        }
    }
}

impl fmt::Display for ExecutionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static metadata about a route, used for UX
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    pub path: ExecutionPath,
    /// Number of analysis producers involved
    pub agents_used: u8,
    /// Expected wall-clock time in seconds, `(min, max)`
    pub expected_time_seconds: (u32, u32),
    pub description: &'static str,
}

/// Minimum expected seconds from which a progress message is worth showing
const PROGRESS_THRESHOLD_SECS: u32 = 5;

const FAST_INFO: RouteInfo = RouteInfo {
    path: ExecutionPath::Fast,
    agents_used: 0,
    expected_time_seconds: (1, 3),
    description: "Quick price check",
};

const TECHNICAL_INFO: RouteInfo = RouteInfo {
    path: ExecutionPath::Single,
    agents_used: 1,
    expected_time_seconds: (5, 10),
    description: "Technical analysis only",
};

const FUNDAMENTAL_INFO: RouteInfo = RouteInfo {
    path: ExecutionPath::Single,
    agents_used: 1,
    expected_time_seconds: (5, 10),
    description: "Fundamental analysis only",
};

const SENTIMENT_INFO: RouteInfo = RouteInfo {
    path: ExecutionPath::Single,
    agents_used: 1,
    expected_time_seconds: (5, 10),
    description: "News & sentiment analysis",
};

const STANDARD_INFO: RouteInfo = RouteInfo {
    path: ExecutionPath::Standard,
    agents_used: 5,
    expected_time_seconds: (15, 25),
    description: "Complete stock analysis",
};

const COMPARISON_INFO: RouteInfo = RouteInfo {
    path: ExecutionPath::Comparison,
    agents_used: 3,
    expected_time_seconds: (18, 30),
    description: "Compare two stocks",
};

const DEEP_DIVE_INFO: RouteInfo = RouteInfo {
    path: ExecutionPath::DeepDive,
    agents_used: 5,
    expected_time_seconds: (25, 45),
    description: "Comprehensive deep dive",
};

/// Reasons an intent cannot be routed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("I couldn't understand your request. Try `/help` for available commands.")]
    UnknownIntent,

    #[error("`{0}` has no analysis pipeline")]
    NoPipeline(IntentKind),

    #[error("Please specify a stock ticker. Example: `/a RELIANCE`")]
    MissingTicker,

    #[error("Please specify two tickers for comparison. Example: `/c TCS INFY`")]
    ComparisonNeedsTwo,

    #[error("Cannot compare {0} with itself. Example: `/c TCS INFY`")]
    DuplicateTickers(String),
}

/// A validated routing decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub path: ExecutionPath,
    pub info: RouteInfo,
    pub progress_message: String,
    pub show_progress: bool,
}

/// Router from intents to execution paths
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentRouter;

impl IntentRouter {
    /// Create a new intent router
    pub fn new() -> Self {
        Self
    }

    /// Check an intent without routing it
    ///
    /// `Help` is valid here even though it has no pipeline; [`route`] rejects
    /// it separately.
    ///
    /// [`route`]: IntentRouter::route
    pub fn validate(&self, intent: &Intent) -> Result<(), RouteError> {
        match intent.kind() {
            IntentKind::Unknown => Err(RouteError::UnknownIntent),
            IntentKind::Help => Ok(()),
            IntentKind::Comparison => match intent.tickers() {
                [] => Err(RouteError::MissingTicker),
                [_] => Err(RouteError::ComparisonNeedsTwo),
                [first, second, ..] if first == second => {
                    Err(RouteError::DuplicateTickers(first.clone()))
                }
                _ => Ok(()),
            },
            _ if intent.tickers().is_empty() => Err(RouteError::MissingTicker),
            _ => Ok(()),
        }
    }

    /// Validate and route an intent
    pub fn route(&self, intent: &Intent) -> Result<Route, RouteError> {
        self.validate(intent)?;

        let info = Self::route_info(intent.kind())
            .ok_or(RouteError::NoPipeline(intent.kind()))?;
        let route = Route {
            path: info.path,
            info,
            progress_message: Self::progress_message(info.path, intent.tickers()),
            show_progress: Self::should_show_progress(&info),
        };

        tracing::debug!(
            "Routed {} for {:?} to {} path",
            intent.kind(),
            intent.tickers(),
            route.path
        );
        Ok(route)
    }

    /// Static route metadata, `None` for kinds without a pipeline
    pub fn route_info(kind: IntentKind) -> Option<RouteInfo> {
        match kind {
            IntentKind::PriceCheck => Some(FAST_INFO),
            IntentKind::TechnicalAnalysis => Some(TECHNICAL_INFO),
            IntentKind::FundamentalAnalysis => Some(FUNDAMENTAL_INFO),
            IntentKind::SentimentAnalysis => Some(SENTIMENT_INFO),
            IntentKind::FullAnalysis => Some(STANDARD_INFO),
            IntentKind::Comparison => Some(COMPARISON_INFO),
            IntentKind::DeepDive => Some(DEEP_DIVE_INFO),
            IntentKind::Help | IntentKind::Unknown => None,
        }
    }

    /// Message shown while a route runs
    pub fn progress_message(path: ExecutionPath, tickers: &[String]) -> String {
        let first = tickers.first().map_or("", String::as_str);
        match path {
            ExecutionPath::Fast => format!("Fetching price for {first}..."),
            ExecutionPath::Single => format!("Analyzing {first}..."),
            ExecutionPath::Standard => {
                let (min, max) = STANDARD_INFO.expected_time_seconds;
                format!("Running full analysis on {first}... Expected time: {min}-{max}s")
            }
            ExecutionPath::Comparison => {
                let second = tickers.get(1).map_or("", String::as_str);
                format!("Comparing {first} vs {second}...")
            }
            ExecutionPath::DeepDive => format!(
                "Starting deep dive on {first}... This may take up to {} seconds.",
                DEEP_DIVE_INFO.expected_time_seconds.1
            ),
        }
    }

    /// Whether a route is slow enough to deserve a progress message
    pub fn should_show_progress(info: &RouteInfo) -> bool {
        info.expected_time_seconds.0 >= PROGRESS_THRESHOLD_SECS
    }
}
