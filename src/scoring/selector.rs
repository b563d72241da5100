//! Scorer selection and the engine's public scoring surface.
//!
//! The engine binds an active scorer lazily on the first request: if both
//! model and scaler artifacts load, scoring is model-backed; otherwise the
//! rule-based scorer takes over. Construction failures convert into the
//! fallback and never reach scoring callers — absence of a model is an
//! expected condition, not an error.

use std::sync::{Arc, RwLock};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::metrics::ScoringMetrics;
use crate::scoring::heuristic::HeuristicScorer;
use crate::scoring::learned::LearnedScorer;
use crate::types::result::{FraudScoreResult, ScoreSource};
use crate::types::transaction::FeatureVector;

/// Which scorer currently backs the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScorerMode {
    Unresolved,
    Heuristic,
    Learned,
}

/// The scorer variant bound at resolution.
///
/// A tagged variant rather than a trait object: the two scorers share
/// nothing beyond this contract.
pub enum ActiveScorer {
    Learned(LearnedScorer),
    Heuristic(HeuristicScorer),
}

impl ActiveScorer {
    /// Fraud probability for one transaction.
    pub fn probability(&self, features: &FeatureVector) -> f64 {
        match self {
            ActiveScorer::Learned(scorer) => scorer.score(features),
            ActiveScorer::Heuristic(scorer) => scorer.score(features),
        }
    }

    /// Tag attached to every result produced by this variant.
    pub fn source(&self) -> ScoreSource {
        match self {
            ActiveScorer::Learned(_) => ScoreSource::Learned,
            ActiveScorer::Heuristic(_) => ScoreSource::Heuristic,
        }
    }
}

/// Process-wide scoring engine with lazy scorer resolution.
///
/// One instance per host process, shared by reference across request
/// handlers. Resolution happens at most once between resets; after that,
/// scoring only reads the bound scorer.
pub struct ScoringEngine {
    config: AppConfig,
    active: RwLock<Option<Arc<ActiveScorer>>>,
    metrics: Arc<ScoringMetrics>,
}

impl ScoringEngine {
    /// Engine that resolves its scorer lazily from the configured artifact
    /// paths.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            active: RwLock::new(None),
            metrics: Arc::new(ScoringMetrics::new()),
        }
    }

    /// Engine pre-bound to a specific scorer variant, skipping artifact
    /// resolution. Lets deterministic hosts supply a seeded or noise-free
    /// fallback scorer.
    pub fn with_active_scorer(config: AppConfig, scorer: ActiveScorer) -> Self {
        Self {
            config,
            active: RwLock::new(Some(Arc::new(scorer))),
            metrics: Arc::new(ScoringMetrics::new()),
        }
    }

    /// Resolve (and cache) the active scorer.
    ///
    /// Idempotent: concurrent first calls converge on a single resolution
    /// and all receive the same scorer. Never fails — when the learned
    /// scorer cannot be constructed, the rule-based scorer is bound
    /// instead.
    pub fn resolve(&self) -> Arc<ActiveScorer> {
        {
            let active = self.active.read().unwrap_or_else(|e| e.into_inner());
            if let Some(scorer) = active.as_ref() {
                return Arc::clone(scorer);
            }
        }

        let mut active = self.active.write().unwrap_or_else(|e| e.into_inner());
        // Another caller may have resolved while we waited for the lock.
        if let Some(scorer) = active.as_ref() {
            return Arc::clone(scorer);
        }

        let scorer = Arc::new(self.construct_scorer());
        *active = Some(Arc::clone(&scorer));
        scorer
    }

    fn construct_scorer(&self) -> ActiveScorer {
        let model_path = &self.config.artifacts.model_path;
        let scaler_path = &self.config.artifacts.scaler_path;

        if !model_path.exists() || !scaler_path.exists() {
            info!(
                model = %model_path.display(),
                scaler = %scaler_path.display(),
                "Model artifacts not available, using rule-based scorer"
            );
            return ActiveScorer::Heuristic(HeuristicScorer::new());
        }

        match LearnedScorer::load(model_path, scaler_path) {
            Ok(scorer) => {
                info!(model = %model_path.display(), "Learned scorer resolved");
                ActiveScorer::Learned(scorer)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    "Failed to construct learned scorer, falling back to rule-based scorer"
                );
                ActiveScorer::Heuristic(HeuristicScorer::new())
            }
        }
    }

    /// Score one transaction with the configured default threshold.
    pub fn score_single(&self, features: &FeatureVector) -> FraudScoreResult {
        self.score_single_with_threshold(features, self.config.detection.threshold)
    }

    /// Score one transaction, classifying against `threshold`.
    pub fn score_single_with_threshold(
        &self,
        features: &FeatureVector,
        threshold: f64,
    ) -> FraudScoreResult {
        let scorer = self.resolve();
        self.score_with(&scorer, features, threshold)
    }

    /// Score a batch in input order, one result per row, with the
    /// configured default threshold.
    pub fn score_batch(&self, rows: &[FeatureVector]) -> Vec<FraudScoreResult> {
        self.score_batch_with_threshold(rows, self.config.detection.threshold)
    }

    /// Score a batch in input order, classifying against `threshold`.
    ///
    /// Rows are independent: each result equals what a single-row call
    /// against the same scorer would produce.
    pub fn score_batch_with_threshold(
        &self,
        rows: &[FeatureVector],
        threshold: f64,
    ) -> Vec<FraudScoreResult> {
        let scorer = self.resolve();
        rows.iter()
            .map(|row| self.score_with(&scorer, row, threshold))
            .collect()
    }

    fn score_with(
        &self,
        scorer: &ActiveScorer,
        features: &FeatureVector,
        threshold: f64,
    ) -> FraudScoreResult {
        let started = Instant::now();
        let probability = scorer.probability(features);
        let result = FraudScoreResult::from_probability(probability, threshold, scorer.source());

        self.metrics.record_score(started.elapsed(), &result);
        debug!(
            probability,
            risk_level = ?result.risk_level,
            source = ?result.source,
            "Transaction scored"
        );

        result
    }

    /// Which scorer currently backs the engine.
    pub fn current_mode(&self) -> ScorerMode {
        let active = self.active.read().unwrap_or_else(|e| e.into_inner());
        match active.as_deref() {
            None => ScorerMode::Unresolved,
            Some(ActiveScorer::Heuristic(_)) => ScorerMode::Heuristic,
            Some(ActiveScorer::Learned(_)) => ScorerMode::Learned,
        }
    }

    /// Drop the resolved scorer; the next request re-resolves from disk.
    pub fn reset(&self) {
        let mut active = self.active.write().unwrap_or_else(|e| e.into_inner());
        *active = None;
        info!("Scoring engine reset, scorer will re-resolve on next request");
    }

    /// Scoring statistics recorded by this engine.
    pub fn metrics(&self) -> Arc<ScoringMetrics> {
        Arc::clone(&self.metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, ArtifactConfig};
    use crate::types::result::RiskLevel;
    use crate::types::transaction::COMPONENT_COUNT;
    use std::io::Write;
    use std::path::PathBuf;
    use std::thread;

    fn missing_artifacts_config() -> AppConfig {
        AppConfig {
            artifacts: ArtifactConfig {
                model_path: PathBuf::from("does/not/exist/model.onnx"),
                scaler_path: PathBuf::from("does/not/exist/scaler.json"),
            },
            ..AppConfig::default()
        }
    }

    fn benign_transaction() -> FeatureVector {
        FeatureVector::new([0.0; COMPONENT_COUNT], 50.0, 43200.0)
    }

    fn suspicious_transaction() -> FeatureVector {
        let mut components = [0.0; COMPONENT_COUNT];
        components[0] = 4.5;
        components[2] = 3.8;
        components[9] = -4.2;
        FeatureVector::new(components, 1500.0, 7200.0)
    }

    #[test]
    fn test_resolves_heuristic_when_artifacts_missing() {
        let engine = ScoringEngine::new(missing_artifacts_config());
        assert_eq!(engine.current_mode(), ScorerMode::Unresolved);

        let result = engine.score_single(&benign_transaction());

        assert_eq!(engine.current_mode(), ScorerMode::Heuristic);
        assert_eq!(result.source, ScoreSource::Heuristic);
        assert!(result.fraud_probability >= 0.0 && result.fraud_probability <= 1.0);
    }

    #[test]
    fn test_resolves_heuristic_when_artifacts_corrupt() {
        let mut model = tempfile::NamedTempFile::new().unwrap();
        model.write_all(b"not an onnx graph").unwrap();
        let mut scaler = tempfile::NamedTempFile::new().unwrap();
        scaler.write_all(b"{}").unwrap();

        let config = AppConfig {
            artifacts: ArtifactConfig {
                model_path: model.path().to_path_buf(),
                scaler_path: scaler.path().to_path_buf(),
            },
            ..AppConfig::default()
        };

        let engine = ScoringEngine::new(config);
        let result = engine.score_single(&suspicious_transaction());

        assert_eq!(engine.current_mode(), ScorerMode::Heuristic);
        assert_eq!(result.source, ScoreSource::Heuristic);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let engine = ScoringEngine::new(missing_artifacts_config());

        let first = engine.resolve();
        let second = engine.resolve();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_concurrent_resolution_converges() {
        let engine = Arc::new(ScoringEngine::new(missing_artifacts_config()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || engine.resolve())
            })
            .collect();

        let scorers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        for scorer in &scorers[1..] {
            assert!(Arc::ptr_eq(&scorers[0], scorer));
        }
        assert_eq!(engine.current_mode(), ScorerMode::Heuristic);
    }

    #[test]
    fn test_reset_returns_to_unresolved() {
        let engine = ScoringEngine::new(missing_artifacts_config());

        engine.score_single(&benign_transaction());
        assert_eq!(engine.current_mode(), ScorerMode::Heuristic);

        engine.reset();
        assert_eq!(engine.current_mode(), ScorerMode::Unresolved);

        engine.score_single(&benign_transaction());
        assert_eq!(engine.current_mode(), ScorerMode::Heuristic);
    }

    #[test]
    fn test_batch_matches_single_row_by_row() {
        let engine = ScoringEngine::with_active_scorer(
            missing_artifacts_config(),
            ActiveScorer::Heuristic(HeuristicScorer::without_noise()),
        );

        let rows = vec![
            benign_transaction(),
            suspicious_transaction(),
            FeatureVector::new([0.0; COMPONENT_COUNT], 750.0, 0.0),
        ];

        let batch = engine.score_batch(&rows);
        let singles: Vec<_> = rows.iter().map(|row| engine.score_single(row)).collect();

        assert_eq!(batch.len(), rows.len());
        assert_eq!(batch, singles);
    }

    #[test]
    fn test_threshold_override() {
        let engine = ScoringEngine::with_active_scorer(
            missing_artifacts_config(),
            ActiveScorer::Heuristic(HeuristicScorer::without_noise()),
        );
        let tx = benign_transaction();

        let default = engine.score_single(&tx);
        assert!(!default.is_fraud);

        // The benign probability (~0.047) exceeds a very permissive
        // threshold.
        let strict = engine.score_single_with_threshold(&tx, 0.01);
        assert!(strict.is_fraud);
        assert_eq!(strict.fraud_probability, default.fraud_probability);
    }

    #[test]
    fn test_known_transactions_classify_as_expected() {
        let engine = ScoringEngine::with_active_scorer(
            missing_artifacts_config(),
            ActiveScorer::Heuristic(HeuristicScorer::without_noise()),
        );

        let benign = engine.score_single(&benign_transaction());
        assert_eq!(benign.risk_level, RiskLevel::Low);
        assert!(!benign.is_fraud);

        let suspicious = engine.score_single(&suspicious_transaction());
        assert_eq!(suspicious.risk_level, RiskLevel::Critical);
        assert!(suspicious.is_fraud);
        assert!(suspicious.confidence > 0.95);
    }

    #[test]
    fn test_metrics_recorded_per_score() {
        let engine = ScoringEngine::new(missing_artifacts_config());

        engine.score_single(&benign_transaction());
        engine.score_batch(&[benign_transaction(), suspicious_transaction()]);

        let metrics = engine.metrics();
        assert_eq!(metrics.transactions_scored(), 3);
    }

    #[test]
    fn test_mode_serialization() {
        assert_eq!(
            serde_json::to_string(&ScorerMode::Heuristic).unwrap(),
            "\"heuristic\""
        );
        assert_eq!(
            serde_json::to_string(&ScorerMode::Unresolved).unwrap(),
            "\"unresolved\""
        );
    }
}
