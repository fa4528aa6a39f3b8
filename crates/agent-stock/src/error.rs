//! Error types for stock analysis operations

use crate::router::RouteError;
use thiserror::Error;

/// Stock analysis specific errors
#[derive(Debug, Error)]
pub enum StockError {
    /// Invalid stock symbol provided
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Data not available for the requested symbol
    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable {
        symbol: String,
        reason: String,
    },

    /// The data source call itself failed
    #[error("Data source error: {0}")]
    DataSource(String),

    /// An analysis producer failed
    #[error("{producer} producer failed: {reason}")]
    Producer {
        producer: String,
        reason: String,
    },

    /// The intent was rejected before any stage ran
    #[error("Invalid request: {0}")]
    Validation(#[from] RouteError),

    /// A holding failed construction checks
    #[error("Invalid holding {ticker}: {reason}")]
    InvalidHolding {
        ticker: String,
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Pipeline construction or execution error
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] agent_workflow::WorkflowError),

    /// Cancelled or out of time
    #[error("{0}")]
    Interrupted(agent_core::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type alias for stock operations
pub type Result<T> = std::result::Result<T, StockError>;

/// Convert StockError to agent_core::Error
impl From<StockError> for agent_core::Error {
    fn from(err: StockError) -> Self {
        match err {
            StockError::Interrupted(inner) => inner,
            other => agent_core::Error::ProcessingFailed(other.to_string()),
        }
    }
}

/// Convert agent_core::Error to StockError
impl From<agent_core::Error> for StockError {
    fn from(err: agent_core::Error) -> Self {
        if err.is_interruption() {
            StockError::Interrupted(err)
        } else {
            StockError::Other(err.to_string())
        }
    }
}

/// Convert anyhow::Error to StockError
impl From<anyhow::Error> for StockError {
    fn from(err: anyhow::Error) -> Self {
        StockError::Other(err.to_string())
    }
}
