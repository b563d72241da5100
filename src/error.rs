//! Error types for the fraud scoring engine.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failure to construct the learned scorer from its on-disk artifacts.
///
/// Raised only during [`crate::LearnedScorer::load`]. The scoring engine
/// converts every variant into a rule-based fallback, so these never reach
/// scoring callers.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The artifact file does not exist at the configured path.
    #[error("artifact not found at {path}")]
    Missing {
        /// Path that was checked.
        path: PathBuf,
    },

    /// The artifact file exists but could not be loaded into a usable
    /// scaler or model. Any unexpected construction failure lands here.
    #[error("artifact at {path} could not be loaded: {reason}")]
    Corrupt {
        /// Path of the offending artifact.
        path: PathBuf,
        /// What went wrong during deserialization or validation.
        reason: String,
    },
}

impl ArtifactError {
    pub(crate) fn missing(path: &Path) -> Self {
        Self::Missing {
            path: path.to_path_buf(),
        }
    }

    pub(crate) fn corrupt(path: &Path, reason: impl ToString) -> Self {
        Self::Corrupt {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// Caller-side contract violation while building a feature vector.
///
/// Surfaced to the caller rather than recovered: a malformed input cannot
/// be scored meaningfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FeatureVectorError {
    /// Positional input did not carry exactly the canonical number of
    /// features.
    #[error("expected {expected} features in positional input, got {actual}")]
    WrongArity {
        /// Required feature count.
        expected: usize,
        /// Feature count actually supplied.
        actual: usize,
    },
}
