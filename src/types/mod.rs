//! Type definitions for the fraud scoring engine

pub mod result;
pub mod transaction;

pub use result::{FraudScoreResult, RiskLevel, ScoreSource};
pub use transaction::FeatureVector;
