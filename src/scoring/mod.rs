//! Fraud probability scorers and their selection

pub mod heuristic;
pub mod learned;
pub mod scaler;
pub mod selector;

pub use heuristic::HeuristicScorer;
pub use learned::LearnedScorer;
pub use scaler::StandardScaler;
pub use selector::{ActiveScorer, ScorerMode, ScoringEngine};
