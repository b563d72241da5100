//! Transaction feature vectors for fraud scoring.

use std::collections::HashMap;

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::FeatureVectorError;

/// Number of anonymized principal components per transaction.
pub const COMPONENT_COUNT: usize = 28;

/// Total features in the canonical vector: `V1..V28`, `Amount`, `Time`.
pub const FEATURE_COUNT: usize = 30;

/// Canonical feature names in scoring order.
///
/// This order is fixed across training-time scaling and inference; the
/// scaled result is meaningless if the two ever disagree.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "V1", "V2", "V3", "V4", "V5", "V6", "V7", "V8", "V9", "V10", "V11", "V12", "V13", "V14",
    "V15", "V16", "V17", "V18", "V19", "V20", "V21", "V22", "V23", "V24", "V25", "V26", "V27",
    "V28", "Amount", "Time",
];

/// A single transaction's model inputs.
///
/// Holds the 28 anonymized components `V1..V28` plus `Amount` and `Time`
/// (seconds since the dataset's reference epoch). Keyed and positional
/// representations interconvert through the canonical ordering in
/// [`FEATURE_NAMES`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    components: [f64; COMPONENT_COUNT],
    amount: f64,
    time: f64,
}

impl FeatureVector {
    /// Create a feature vector from its parts.
    pub fn new(components: [f64; COMPONENT_COUNT], amount: f64, time: f64) -> Self {
        Self {
            components,
            amount,
            time,
        }
    }

    /// Build from a keyed representation.
    ///
    /// Missing keys are backfilled with `0.0`, matching the behavior the
    /// web layer relies on for partially filled forms.
    pub fn from_keyed(values: &HashMap<String, f64>) -> Self {
        let mut components = [0.0; COMPONENT_COUNT];
        for (index, slot) in components.iter_mut().enumerate() {
            *slot = values.get(FEATURE_NAMES[index]).copied().unwrap_or(0.0);
        }

        Self {
            components,
            amount: values.get("Amount").copied().unwrap_or(0.0),
            time: values.get("Time").copied().unwrap_or(0.0),
        }
    }

    /// Build from positional values in canonical order.
    ///
    /// Fails if the slice does not carry exactly [`FEATURE_COUNT`] values.
    pub fn from_positional(values: &[f64]) -> Result<Self, FeatureVectorError> {
        if values.len() != FEATURE_COUNT {
            return Err(FeatureVectorError::WrongArity {
                expected: FEATURE_COUNT,
                actual: values.len(),
            });
        }

        let mut components = [0.0; COMPONENT_COUNT];
        components.copy_from_slice(&values[..COMPONENT_COUNT]);

        Ok(Self {
            components,
            amount: values[COMPONENT_COUNT],
            time: values[COMPONENT_COUNT + 1],
        })
    }

    /// Component `V{index}`, 1-based to match the dataset naming.
    pub fn component(&self, index: usize) -> f64 {
        self.components[index - 1]
    }

    /// All anonymized components in order.
    pub fn components(&self) -> &[f64; COMPONENT_COUNT] {
        &self.components
    }

    /// Transaction amount.
    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Seconds since the reference epoch.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Hour of day derived from `Time`, wrapping past 24 hours.
    pub fn hour_of_day(&self) -> f64 {
        (self.time / 3600.0) % 24.0
    }

    /// The canonical positional layout consumed by scaling and inference.
    pub fn as_array(&self) -> [f64; FEATURE_COUNT] {
        let mut out = [0.0; FEATURE_COUNT];
        out[..COMPONENT_COUNT].copy_from_slice(&self.components);
        out[COMPONENT_COUNT] = self.amount;
        out[COMPONENT_COUNT + 1] = self.time;
        out
    }
}

impl TryFrom<&[f64]> for FeatureVector {
    type Error = FeatureVectorError;

    fn try_from(values: &[f64]) -> Result<Self, Self::Error> {
        Self::from_positional(values)
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let values = self.as_array();
        let mut map = serializer.serialize_map(Some(FEATURE_COUNT))?;
        for (name, value) in FEATURE_NAMES.iter().zip(values.iter()) {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FeatureVector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = HashMap::<String, f64>::deserialize(deserializer)?;
        Ok(Self::from_keyed(&values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyed_construction_backfills_missing() {
        let mut values = HashMap::new();
        values.insert("V1".to_string(), 2.5);
        values.insert("V14".to_string(), -1.2);
        values.insert("Amount".to_string(), 120.0);

        let fv = FeatureVector::from_keyed(&values);

        assert_eq!(fv.component(1), 2.5);
        assert_eq!(fv.component(14), -1.2);
        assert_eq!(fv.component(2), 0.0);
        assert_eq!(fv.amount(), 120.0);
        assert_eq!(fv.time(), 0.0);
    }

    #[test]
    fn test_positional_construction() {
        let mut values = vec![0.0; FEATURE_COUNT];
        values[0] = 1.5; // V1
        values[27] = -0.5; // V28
        values[28] = 250.0; // Amount
        values[29] = 7200.0; // Time

        let fv = FeatureVector::from_positional(&values).unwrap();

        assert_eq!(fv.component(1), 1.5);
        assert_eq!(fv.component(28), -0.5);
        assert_eq!(fv.amount(), 250.0);
        assert_eq!(fv.time(), 7200.0);
    }

    #[test]
    fn test_positional_rejects_wrong_arity() {
        let values = vec![0.0; FEATURE_COUNT - 1];
        let err = FeatureVector::from_positional(&values).unwrap_err();
        assert_eq!(
            err,
            FeatureVectorError::WrongArity {
                expected: FEATURE_COUNT,
                actual: FEATURE_COUNT - 1,
            }
        );

        let values = vec![0.0; FEATURE_COUNT + 3];
        assert!(FeatureVector::try_from(values.as_slice()).is_err());
    }

    #[test]
    fn test_canonical_round_trip() {
        let mut values = vec![0.0; FEATURE_COUNT];
        for (i, value) in values.iter_mut().enumerate() {
            *value = i as f64 * 0.1;
        }

        let fv = FeatureVector::from_positional(&values).unwrap();
        assert_eq!(fv.as_array().to_vec(), values);
    }

    #[test]
    fn test_hour_of_day_wraps() {
        let fv = FeatureVector::new([0.0; COMPONENT_COUNT], 0.0, 43200.0);
        assert_eq!(fv.hour_of_day(), 12.0);

        // 25 hours past the epoch lands at 1 AM.
        let fv = FeatureVector::new([0.0; COMPONENT_COUNT], 0.0, 90000.0);
        assert_eq!(fv.hour_of_day(), 1.0);
    }

    #[test]
    fn test_serde_round_trip() {
        let mut components = [0.0; COMPONENT_COUNT];
        components[0] = 4.5;
        components[9] = -4.2;
        let fv = FeatureVector::new(components, 1500.0, 7200.0);

        let json = serde_json::to_string(&fv).unwrap();
        let back: FeatureVector = serde_json::from_str(&json).unwrap();

        assert_eq!(fv, back);
    }

    #[test]
    fn test_deserialize_sparse_map() {
        let json = r#"{"V3": 3.8, "Amount": 99.0}"#;
        let fv: FeatureVector = serde_json::from_str(json).unwrap();

        assert_eq!(fv.component(3), 3.8);
        assert_eq!(fv.amount(), 99.0);
        assert_eq!(fv.component(7), 0.0);
    }
}
