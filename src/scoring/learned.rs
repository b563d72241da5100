//! Learned fraud scorer backed by a trained ONNX model.
//!
//! Wraps two externally-trained artifacts: the fitted feature scaler and
//! the probability model. Construction is the only fallible step; once
//! loaded, scoring applies the same scale-then-predict pipeline to every
//! row.

use std::path::Path;
use std::sync::RwLock;

use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType};
use tracing::{debug, info, warn};

use crate::error::ArtifactError;
use crate::scoring::scaler::StandardScaler;
use crate::types::transaction::{FeatureVector, FEATURE_COUNT};

/// Adapter over a trained probability model and its fitted scaler.
///
/// The session sits behind an `RwLock` because ONNX Runtime requires
/// exclusive access to run; callers still share the scorer behind an `Arc`.
#[derive(Debug)]
pub struct LearnedScorer {
    session: RwLock<Session>,
    scaler: StandardScaler,
    input_name: String,
    output_name: String,
}

impl LearnedScorer {
    /// Load the model and scaler artifacts from disk.
    ///
    /// Fails with [`ArtifactError::Missing`] when either file is absent and
    /// [`ArtifactError::Corrupt`] when either cannot be loaded into a
    /// usable object; any other construction failure is reported as
    /// corrupt.
    pub fn load(model_path: &Path, scaler_path: &Path) -> Result<Self, ArtifactError> {
        if !model_path.exists() {
            return Err(ArtifactError::missing(model_path));
        }

        let scaler = StandardScaler::load(scaler_path)?;

        ort::init()
            .commit()
            .map_err(|e| ArtifactError::corrupt(model_path, e))?;

        let session = (|| {
            Session::builder()?
                .with_optimization_level(GraphOptimizationLevel::Level3)?
                .with_intra_threads(1)?
                .commit_from_file(model_path)
        })()
        .map_err(|e| ArtifactError::corrupt(model_path, e))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob") || o.name.contains("output"))
            .map(|o| o.name.clone())
            .unwrap_or_else(|| {
                session
                    .outputs
                    .last()
                    .map(|o| o.name.clone())
                    .unwrap_or_else(|| "probabilities".to_string())
            });

        info!(
            model = %model_path.display(),
            input = %input_name,
            output = %output_name,
            "Learned model loaded"
        );

        Ok(Self {
            session: RwLock::new(session),
            scaler,
            input_name,
            output_name,
        })
    }

    /// Fraud probability for one transaction.
    ///
    /// Pure in its input once the scorer is constructed. Inference failures
    /// degrade to a neutral score rather than escaping, so scoring callers
    /// never observe an error from this path.
    pub fn score(&self, features: &FeatureVector) -> f64 {
        let scaled = self.scaler.transform(&features.as_array());

        match self.run(scaled) {
            Ok(probability) => probability.clamp(0.0, 1.0),
            Err(e) => {
                warn!(error = %e, "Model inference failed, using neutral score");
                0.5
            }
        }
    }

    /// Score a batch row-wise; equivalent to calling [`Self::score`] on
    /// each row in order.
    pub fn score_batch(&self, rows: &[FeatureVector]) -> Vec<f64> {
        rows.iter().map(|row| self.score(row)).collect()
    }

    fn run(&self, scaled: Vec<f32>) -> Result<f64> {
        use ort::value::Tensor;

        let shape = vec![1_i64, FEATURE_COUNT as i64];
        let input_tensor =
            Tensor::from_array((shape, scaled)).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .write()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let outputs = session.run(ort::inputs![&self.input_name => input_tensor])?;

        extract_probability(&outputs, &self.output_name)
    }
}

/// Extract the fraud-class probability from model outputs.
///
/// Handles tensor outputs (neural nets, XGBoost-style exports) and the
/// `seq(map(int64, float))` shape emitted by tree-library exports.
fn extract_probability(outputs: &ort::session::SessionOutputs, output_name: &str) -> Result<f64> {
    if let Some(output) = outputs.get(output_name) {
        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            return Ok(probability_from_tensor(&shape, data));
        }

        if DynSequenceValueType::can_downcast(&output.dtype()) {
            if let Ok(probability) = probability_from_sequence_map(output) {
                return Ok(probability);
            }
        }
    }

    // The preferred output was absent or in an unexpected shape; scan the
    // remaining outputs, skipping class labels.
    for (name, output) in outputs.iter() {
        if name.contains("label") {
            continue;
        }

        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            debug!(output = %name, "Extracted probability from fallback output");
            return Ok(probability_from_tensor(&shape, data));
        }

        if DynSequenceValueType::can_downcast(&output.dtype()) {
            if let Ok(probability) = probability_from_sequence_map(&output) {
                return Ok(probability);
            }
        }
    }

    warn!("Could not extract a probability from model outputs, using neutral score");
    Ok(0.5)
}

/// Probability from tensor data: `[batch, 2]` two-class outputs take the
/// fraud class, `[batch, 1]` and flat shapes take the single value.
fn probability_from_tensor(shape: &ort::tensor::Shape, data: &[f32]) -> f64 {
    let dims: Vec<i64> = shape.iter().copied().collect();

    let value = if dims.len() == 2 {
        match dims[1] {
            classes if classes >= 2 => data.get(1),
            1 => data.first(),
            _ => data.last(),
        }
    } else if dims.len() == 1 {
        match dims[0] {
            classes if classes >= 2 => data.get(1),
            1 => data.first(),
            _ => data.last(),
        }
    } else {
        data.last()
    };

    value.map(|&v| v as f64).unwrap_or(0.5)
}

/// Probability from the `seq(map(int64, float))` format, keyed by class id.
fn probability_from_sequence_map(output: &ort::value::DynValue) -> Result<f64> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;

    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
    let class_map = maps
        .first()
        .ok_or_else(|| anyhow::anyhow!("Empty sequence output"))?;

    let kv_pairs = class_map.try_extract_key_values::<i64, f32>()?;

    for (class_id, probability) in &kv_pairs {
        if *class_id == 1 {
            return Ok(*probability as f64);
        }
    }

    // No fraud class present; invert the legitimate-class probability.
    for (class_id, probability) in &kv_pairs {
        if *class_id == 0 {
            return Ok(1.0 - *probability as f64);
        }
    }

    Err(anyhow::anyhow!("No class probability in map output"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::transaction::FEATURE_NAMES;
    use std::io::Write;

    fn valid_scaler_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let artifact = serde_json::json!({
            "mean": vec![0.0; FEATURE_COUNT],
            "scale": vec![1.0; FEATURE_COUNT],
            "feature_names": FEATURE_NAMES,
        });
        file.write_all(artifact.to_string().as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_missing_model() {
        let scaler = valid_scaler_file();
        let err =
            LearnedScorer::load(Path::new("does/not/exist.onnx"), scaler.path()).unwrap_err();
        assert!(matches!(err, ArtifactError::Missing { .. }));
    }

    #[test]
    fn test_load_missing_scaler() {
        let model = tempfile::NamedTempFile::new().unwrap();
        let err =
            LearnedScorer::load(model.path(), Path::new("does/not/exist.json")).unwrap_err();
        assert!(matches!(err, ArtifactError::Missing { .. }));
    }

    #[test]
    fn test_load_corrupt_scaler() {
        let model = tempfile::NamedTempFile::new().unwrap();
        let mut scaler = tempfile::NamedTempFile::new().unwrap();
        scaler.write_all(b"{\"mean\": \"garbage\"}").unwrap();

        let err = LearnedScorer::load(model.path(), scaler.path()).unwrap_err();
        assert!(matches!(err, ArtifactError::Corrupt { .. }));
    }

    #[test]
    fn test_load_corrupt_model() {
        let mut model = tempfile::NamedTempFile::new().unwrap();
        model.write_all(b"not an onnx graph").unwrap();
        let scaler = valid_scaler_file();

        let err = LearnedScorer::load(model.path(), scaler.path()).unwrap_err();
        assert!(matches!(err, ArtifactError::Corrupt { .. }));
    }
}
