//! Fitted feature-standardization transform.
//!
//! The training pipeline fits a standard scaler once and persists its
//! statistics; inference applies the identical transform. The artifact is a
//! JSON document with per-feature `mean` and `scale` in canonical order,
//! optionally carrying the `feature_names` the fit used so an ordering
//! drift between training and inference is caught at load time.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ArtifactError;
use crate::types::transaction::{FEATURE_COUNT, FEATURE_NAMES};

/// Standardization statistics fitted at training time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    feature_names: Option<Vec<String>>,
}

impl StandardScaler {
    /// Load the scaler artifact from disk.
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        if !path.exists() {
            return Err(ArtifactError::missing(path));
        }

        let raw = fs::read_to_string(path).map_err(|e| ArtifactError::corrupt(path, e))?;
        let scaler: Self =
            serde_json::from_str(&raw).map_err(|e| ArtifactError::corrupt(path, e))?;
        scaler
            .validate()
            .map_err(|reason| ArtifactError::corrupt(path, reason))?;

        info!(path = %path.display(), "Scaler statistics loaded");
        Ok(scaler)
    }

    /// Standardize one row: `(x - mean) / scale`, emitted as the `f32`
    /// layout the model input expects.
    pub fn transform(&self, features: &[f64; FEATURE_COUNT]) -> Vec<f32> {
        features
            .iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(value, (mean, scale))| ((value - mean) / scale) as f32)
            .collect()
    }

    fn validate(&self) -> Result<(), String> {
        if self.mean.len() != FEATURE_COUNT || self.scale.len() != FEATURE_COUNT {
            return Err(format!(
                "expected {} statistics per feature, got mean={} scale={}",
                FEATURE_COUNT,
                self.mean.len(),
                self.scale.len()
            ));
        }
        if self.mean.iter().any(|mean| !mean.is_finite()) {
            return Err("mean contains non-finite entries".to_string());
        }
        if self.scale.iter().any(|scale| !scale.is_finite() || *scale <= 0.0) {
            return Err("scale entries must be finite and positive".to_string());
        }
        if let Some(names) = &self.feature_names {
            let canonical = names.len() == FEATURE_COUNT
                && names.iter().zip(FEATURE_NAMES.iter()).all(|(a, b)| a == b);
            if !canonical {
                return Err(
                    "feature ordering does not match the canonical V1..V28, Amount, Time layout"
                        .to_string(),
                );
            }
        }
        Ok(())
    }
}
