//! Logging configuration

use serde::{Deserialize, Serialize};

/// Environment variable holding the log filter directives
pub const LOG_FILTER_ENV: &str = "RUST_LOG";
/// Environment variable selecting the output format ("json" or "text")
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directives, e.g. `info,agent_workflow=debug`
    pub filter: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Load from `RUST_LOG` and `LOG_FORMAT`, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(filter) = lookup(LOG_FILTER_ENV).filter(|f| !f.trim().is_empty()) {
            config.filter = filter;
        }
        if let Some(format) = lookup(LOG_FORMAT_ENV) {
            config.json = format.trim().eq_ignore_ascii_case("json");
        }
        config
    }
}
