//! Feature extraction for fraud model inference.
//!
//! The classifier expects a fixed 30-input vector: the hour of the
//! transaction, its amount, then `V1`..`V28` in order.

use crate::types::transaction::{v_feature_name, Transaction, V_FEATURE_COUNT};

/// Total number of model inputs
pub const FEATURE_COUNT: usize = 2 + V_FEATURE_COUNT;

/// Feature extractor that transforms transactions into model input features.
pub struct FeatureExtractor {
    v_names: Vec<String>,
}

impl FeatureExtractor {
    /// Create a new feature extractor.
    pub fn new() -> Self {
        Self {
            v_names: (1..=V_FEATURE_COUNT).map(v_feature_name).collect(),
        }
    }

    /// Extract features from a transaction.
    ///
    /// Missing `V` slots are filled with 0.0. The `Time` and `Amount` slots
    /// in the feature map are ignored; hour and amount come from the
    /// transaction itself.
    pub fn extract(&self, tx: &Transaction) -> Vec<f32> {
        let mut features = Vec::with_capacity(FEATURE_COUNT);

        features.push(tx.hour() as f32);
        features.push(tx.amount as f32);

        for name in &self.v_names {
            features.push(tx.feature(name).unwrap_or(0.0) as f32);
        }

        features
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Get feature names in vector order.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = vec!["Time".to_string(), "Amount".to_string()];
        names.extend(self.v_names.iter().cloned());
        names
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}
