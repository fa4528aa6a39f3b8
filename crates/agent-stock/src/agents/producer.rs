//! Producer contracts
//!
//! Producers are the analysis collaborators (usually LLM-backed) that turn
//! market data into scored reports. They should degrade to
//! [`AnalysisReport::neutral`] rather than fail; an `Err` is still tolerated
//! and isolated by the pipeline.

use super::bundle::{ComparisonBundle, InputBundle};
use super::report::{AnalysisKind, AnalysisReport};
use crate::error::{Result, StockError};
use agent_core::ExecContext;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Single-ticker analysis producer
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalysisProducer: Send + Sync {
    /// Kind of report this producer writes
    fn kind(&self) -> AnalysisKind;

    async fn analyze(&self, input: InputBundle, ctx: &ExecContext) -> Result<AnalysisReport>;
}

/// Two-ticker comparison producer
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ComparisonProducer: Send + Sync {
    async fn compare(&self, input: ComparisonBundle, ctx: &ExecContext) -> Result<AnalysisReport>;
}

/// The full set of producers a pipeline needs
#[derive(Clone)]
pub struct ProducerSet {
    pub fundamental: Arc<dyn AnalysisProducer>,
    pub technical: Arc<dyn AnalysisProducer>,
    pub sentiment: Arc<dyn AnalysisProducer>,
    pub risk: Arc<dyn AnalysisProducer>,
    pub synthesis: Arc<dyn AnalysisProducer>,
    pub comparison: Arc<dyn ComparisonProducer>,
}

impl ProducerSet {
    /// Producer registered for a single-ticker kind
    pub fn get(&self, kind: AnalysisKind) -> Option<&Arc<dyn AnalysisProducer>> {
        match kind {
            AnalysisKind::Fundamental => Some(&self.fundamental),
            AnalysisKind::Technical => Some(&self.technical),
            AnalysisKind::Sentiment => Some(&self.sentiment),
            AnalysisKind::Risk => Some(&self.risk),
            AnalysisKind::Synthesis => Some(&self.synthesis),
            AnalysisKind::Comparison => None,
        }
    }

    /// Check that every slot holds a producer of the matching kind
    pub fn validate(&self) -> Result<()> {
        let kinds = [
            AnalysisKind::Fundamental,
            AnalysisKind::Technical,
            AnalysisKind::Sentiment,
            AnalysisKind::Risk,
            AnalysisKind::Synthesis,
        ];
        for expected in kinds {
            let Some(producer) = self.get(expected) else {
                continue;
            };
            let actual = producer.kind();
            if actual != expected {
                return Err(StockError::ConfigError(format!(
                    "{expected} slot holds a {actual} producer"
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ProducerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProducerSet")
            .field("fundamental", &self.fundamental.kind())
            .field("technical", &self.technical.kind())
            .field("sentiment", &self.sentiment.kind())
            .field("risk", &self.risk.kind())
            .field("synthesis", &self.synthesis.kind())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn producer(kind: AnalysisKind) -> Arc<dyn AnalysisProducer> {
        let mut mock = MockAnalysisProducer::new();
        mock.expect_kind().return_const(kind);
        Arc::new(mock)
    }

    fn set(fundamental: AnalysisKind) -> ProducerSet {
        ProducerSet {
            fundamental: producer(fundamental),
            technical: producer(AnalysisKind::Technical),
            sentiment: producer(AnalysisKind::Sentiment),
            risk: producer(AnalysisKind::Risk),
            synthesis: producer(AnalysisKind::Synthesis),
            comparison: Arc::new(MockComparisonProducer::new()),
        }
    }

    #[test]
    fn test_validate_matching_kinds() {
        assert!(set(AnalysisKind::Fundamental).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_mismatch() {
        let err = set(AnalysisKind::Technical).validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: fundamental slot holds a technical producer"
        );
    }

    #[test]
    fn test_get() {
        let producers = set(AnalysisKind::Fundamental);
        assert_eq!(
            producers.get(AnalysisKind::Risk).map(|p| p.kind()),
            Some(AnalysisKind::Risk)
        );
        assert!(producers.get(AnalysisKind::Comparison).is_none());
    }
}
