//! Rule-based fraud scorer requiring no trained artifacts.
//!
//! An additive point system over statistical patterns in the anonymized
//! feature space: large (or suspiciously tiny) amounts, outlying principal
//! components, late-night activity. Always constructible, so the engine can
//! degrade to it whenever the learned model is unavailable.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::types::transaction::{FeatureVector, COMPONENT_COUNT};

/// Components most correlated with fraud in the anonymized feature space.
const SENSITIVE_COMPONENTS: [usize; 6] = [1, 3, 4, 10, 12, 14];

/// Magnitude beyond which a sensitive component counts as an anomaly.
const ANOMALY_MAGNITUDE: f64 = 3.0;

/// Magnitude beyond which any component counts as an extreme outlier.
const EXTREME_MAGNITUDE: f64 = 4.0;

const HIGH_AMOUNT: f64 = 1000.0;
const ELEVATED_AMOUNT: f64 = 500.0;
const MICRO_AMOUNT: f64 = 1.0;

const HIGH_AMOUNT_POINTS: f64 = 0.15;
const ELEVATED_AMOUNT_POINTS: f64 = 0.08;
const MICRO_AMOUNT_POINTS: f64 = 0.05;
const ANOMALY_POINTS: f64 = 0.08;
const EXTREME_OUTLIER_POINTS: f64 = 0.12;
const REPEATED_ANOMALY_BONUS: f64 = 0.15;
const REPEATED_OUTLIER_BONUS: f64 = 0.20;
const NIGHT_HOURS_POINTS: f64 = 0.05;
const AMOUNT_ANOMALY_COMBO_POINTS: f64 = 0.15;

/// Half-width of the uniform noise band added to the raw score.
const NOISE_BAND: f64 = 0.05;

enum NoiseSource {
    Rng(Mutex<StdRng>),
    Disabled,
}

/// Deterministic rule-based fraud probability estimator.
///
/// The point constants are fixed scoring policy; only the noise generator
/// is pluggable so deterministic hosts and tests can pin or silence it.
pub struct HeuristicScorer {
    noise: NoiseSource,
}

impl HeuristicScorer {
    /// Scorer with entropy-seeded noise.
    pub fn new() -> Self {
        Self {
            noise: NoiseSource::Rng(Mutex::new(StdRng::from_entropy())),
        }
    }

    /// Scorer whose noise stream is reproducible from `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            noise: NoiseSource::Rng(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    /// Scorer with the noise term fixed to zero.
    pub fn without_noise() -> Self {
        Self {
            noise: NoiseSource::Disabled,
        }
    }

    /// Estimate the fraud probability for one transaction.
    pub fn score(&self, features: &FeatureVector) -> f64 {
        let mut raw_score = 0.0;

        let amount = features.amount();
        if amount > HIGH_AMOUNT {
            raw_score += HIGH_AMOUNT_POINTS;
        } else if amount > ELEVATED_AMOUNT {
            raw_score += ELEVATED_AMOUNT_POINTS;
        } else if amount < MICRO_AMOUNT {
            raw_score += MICRO_AMOUNT_POINTS;
        }

        let mut suspicious_count = 0u32;
        for &index in &SENSITIVE_COMPONENTS {
            if features.component(index).abs() > ANOMALY_MAGNITUDE {
                suspicious_count += 1;
                raw_score += ANOMALY_POINTS;
            }
        }

        let mut extreme_outliers = 0u32;
        for index in 1..=COMPONENT_COUNT {
            if features.component(index).abs() > EXTREME_MAGNITUDE {
                extreme_outliers += 1;
                raw_score += EXTREME_OUTLIER_POINTS;
            }
        }

        if suspicious_count >= 3 {
            raw_score += REPEATED_ANOMALY_BONUS;
        }
        if extreme_outliers >= 2 {
            raw_score += REPEATED_OUTLIER_BONUS;
        }

        let hour = features.hour_of_day();
        if (0.0..6.0).contains(&hour) {
            raw_score += NIGHT_HOURS_POINTS;
        }

        if amount > ELEVATED_AMOUNT && suspicious_count >= 2 {
            raw_score += AMOUNT_ANOMALY_COMBO_POINTS;
        }

        let clamped = (raw_score + self.noise_draw()).clamp(0.0, 1.0);
        let probability = smooth(clamped);

        trace!(
            raw_score,
            suspicious_count,
            extreme_outliers,
            probability,
            "Heuristic score computed"
        );

        probability
    }

    /// Score a batch row-wise, preserving input order.
    pub fn score_batch(&self, rows: &[FeatureVector]) -> Vec<f64> {
        rows.iter().map(|row| self.score(row)).collect()
    }

    fn noise_draw(&self) -> f64 {
        match &self.noise {
            NoiseSource::Rng(rng) => match rng.lock() {
                Ok(mut rng) => rng.gen_range(-NOISE_BAND..=NOISE_BAND),
                Err(_) => 0.0,
            },
            NoiseSource::Disabled => 0.0,
        }
    }
}

impl Default for HeuristicScorer {
    fn default() -> Self {
        Self::new()
    }
}

/// Logistic smoothing that spreads additive scores away from the extremes.
///
/// `x = (raw - 0.5) * 6`, `p = 1 / (1 + e^-x)`. The raw additive score is
/// never returned directly.
fn smooth(raw_score: f64) -> f64 {
    let x = (raw_score - 0.5) * 6.0;
    1.0 / (1.0 + (-x).exp())
}
