//! Fraud score results and risk tiers.

use serde::{Deserialize, Serialize};

/// Risk tier classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Classify a fraud probability into its risk tier.
    ///
    /// The tiers partition `[0, 1]` with closed-open intervals:
    /// `[0, 0.25)` Low, `[0.25, 0.50)` Medium, `[0.50, 0.75)` High,
    /// `[0.75, 1.0]` Critical. Both scorer variants go through this one
    /// implementation.
    pub fn from_probability(probability: f64) -> Self {
        if probability < 0.25 {
            RiskLevel::Low
        } else if probability < 0.50 {
            RiskLevel::Medium
        } else if probability < 0.75 {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }
}

/// Which scorer variant produced a result.
///
/// Lets callers distinguish degraded rule-based answers from model-backed
/// ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSource {
    Learned,
    Heuristic,
}

/// Outcome of scoring one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudScoreResult {
    /// Whether the probability exceeded the classification threshold.
    pub is_fraud: bool,

    /// Estimated fraud probability in `[0, 1]`.
    pub fraud_probability: f64,

    /// Distance from the decision midpoint: `max(p, 1 - p)`, in `[0.5, 1]`.
    pub confidence: f64,

    /// Risk tier derived from the probability.
    pub risk_level: RiskLevel,

    /// Scorer variant that produced the probability.
    pub source: ScoreSource,
}

impl FraudScoreResult {
    /// Assemble a result from a raw probability and classification
    /// threshold.
    pub fn from_probability(probability: f64, threshold: f64, source: ScoreSource) -> Self {
        Self {
            is_fraud: probability > threshold,
            fraud_probability: probability,
            confidence: probability.max(1.0 - probability),
            risk_level: RiskLevel::from_probability(probability),
            source,
        }
    }
}
