//! Analysis producers: the contract, their inputs and their reports

pub mod bundle;
pub mod producer;
pub mod report;

pub use bundle::{CompareSide, ComparisonBundle, InputBundle};
pub use producer::{AnalysisProducer, ComparisonProducer, ProducerSet};
pub use report::{AnalysisKind, AnalysisReport, Confidence, NEUTRAL_SCORE};
