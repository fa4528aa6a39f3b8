//! Configuration for stock analysis operations

use crate::error::{Result, StockError};
use crate::router::ExecutionPath;
use crate::synthesis::Horizon;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable for the investment horizon
pub const TIME_HORIZON_ENV: &str = "STOCK_TIME_HORIZON";
/// Environment variable for the inter-holding delay in milliseconds
pub const HOLDING_DELAY_ENV: &str = "STOCK_HOLDING_DELAY_MS";
/// Environment variable for the per-stage timeout in seconds
pub const STAGE_TIMEOUT_ENV: &str = "STOCK_STAGE_TIMEOUT_SECS";

/// Time allowed for a whole run, per execution path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunBudgets {
    pub fast: Duration,
    pub single: Duration,
    pub standard: Duration,
    pub comparison: Duration,
    pub deep_dive: Duration,
}

impl Default for RunBudgets {
    fn default() -> Self {
        Self {
            fast: Duration::from_secs(10),
            single: Duration::from_secs(15),
            standard: Duration::from_secs(45),
            comparison: Duration::from_secs(45),
            deep_dive: Duration::from_secs(60),
        }
    }
}

impl RunBudgets {
    pub fn for_path(&self, path: ExecutionPath) -> Duration {
        match path {
            ExecutionPath::Fast => self.fast,
            ExecutionPath::Single => self.single,
            ExecutionPath::Standard => self.standard,
            ExecutionPath::Comparison => self.comparison,
            ExecutionPath::DeepDive => self.deep_dive,
        }
    }
}

/// Configuration for stock analysis operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockConfig {
    /// Investment horizon used to weight component scores
    pub time_horizon: String,

    /// Days of price history requested from the data source
    pub historical_days: u32,

    /// Pause between two holdings of a portfolio
    pub holding_delay: Duration,

    /// Cap for a single pipeline stage
    pub stage_timeout: Option<Duration>,

    /// Run budgets used when the caller sets no deadline
    pub run_budgets: RunBudgets,
}

impl Default for StockConfig {
    fn default() -> Self {
        Self {
            time_horizon: "medium".to_string(),
            historical_days: 180,
            holding_delay: Duration::from_secs(1),
            stage_timeout: Some(Duration::from_secs(15)),
            run_budgets: RunBudgets::default(),
        }
    }
}

impl StockConfig {
    /// Create a new configuration builder
    pub fn builder() -> StockConfigBuilder {
        StockConfigBuilder::default()
    }

    /// Defaults overridden by `STOCK_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::builder().with_env().build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.time_horizon.trim().is_empty() {
            return Err(StockError::ConfigError(
                "time_horizon must not be empty".to_string(),
            ));
        }

        if self.historical_days == 0 {
            return Err(StockError::ConfigError(
                "historical_days must be greater than 0".to_string(),
            ));
        }

        if self.stage_timeout.is_some_and(|t| t.is_zero()) {
            return Err(StockError::ConfigError(
                "stage_timeout must be greater than 0".to_string(),
            ));
        }

        if ExecutionPath::ALL
            .iter()
            .any(|path| self.run_budgets.for_path(*path).is_zero())
        {
            return Err(StockError::ConfigError(
                "run budgets must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Parsed investment horizon
    pub fn horizon(&self) -> Horizon {
        Horizon::parse(&self.time_horizon)
    }

    /// Run budget for an execution path
    pub fn run_budget(&self, path: ExecutionPath) -> Duration {
        self.run_budgets.for_path(path)
    }
}

/// Builder for StockConfig
#[derive(Debug, Default)]
pub struct StockConfigBuilder {
    time_horizon: Option<String>,
    historical_days: Option<u32>,
    holding_delay: Option<Duration>,
    stage_timeout: Option<Option<Duration>>,
    run_budgets: Option<RunBudgets>,
    env_errors: Vec<String>,
}

impl StockConfigBuilder {
    /// Set the investment horizon ("short", "medium", "long", ...)
    pub fn time_horizon(mut self, horizon: impl Into<String>) -> Self {
        self.time_horizon = Some(horizon.into());
        self
    }

    /// Set the number of history days to request
    pub fn historical_days(mut self, days: u32) -> Self {
        self.historical_days = Some(days);
        self
    }

    /// Set the pause between portfolio holdings
    pub fn holding_delay(mut self, delay: Duration) -> Self {
        self.holding_delay = Some(delay);
        self
    }

    /// Set the per-stage timeout, `None` to disable it
    pub fn stage_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stage_timeout = Some(timeout);
        self
    }

    /// Set the run budgets
    pub fn run_budgets(mut self, budgets: RunBudgets) -> Self {
        self.run_budgets = Some(budgets);
        self
    }

    /// Load overrides from the process environment
    pub fn with_env(self) -> Self {
        self.with_lookup(|key| std::env::var(key).ok())
    }

    /// Load overrides through an arbitrary variable lookup
    pub fn with_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(horizon) = lookup(TIME_HORIZON_ENV) {
            self.time_horizon = Some(horizon);
        }
        if let Some(raw) = lookup(HOLDING_DELAY_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.holding_delay = Some(Duration::from_millis(ms)),
                Err(_) => self
                    .env_errors
                    .push(format!("{HOLDING_DELAY_ENV} must be an integer, got '{raw}'")),
            }
        }
        if let Some(raw) = lookup(STAGE_TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(0) => self.stage_timeout = Some(None),
                Ok(secs) => self.stage_timeout = Some(Some(Duration::from_secs(secs))),
                Err(_) => self
                    .env_errors
                    .push(format!("{STAGE_TIMEOUT_ENV} must be an integer, got '{raw}'")),
            }
        }
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<StockConfig> {
        if let Some(first) = self.env_errors.into_iter().next() {
            return Err(StockError::ConfigError(first));
        }

        let defaults = StockConfig::default();

        let config = StockConfig {
            time_horizon: self.time_horizon.unwrap_or(defaults.time_horizon),
            historical_days: self.historical_days.unwrap_or(defaults.historical_days),
            holding_delay: self.holding_delay.unwrap_or(defaults.holding_delay),
            stage_timeout: self.stage_timeout.unwrap_or(defaults.stage_timeout),
            run_budgets: self.run_budgets.unwrap_or(defaults.run_budgets),
        };

        config.validate()?;
        Ok(config)
    }
}
