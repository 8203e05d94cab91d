//! Fraud decision rule

use crate::error::{PipelineError, PipelineResult};
use crate::types::transaction::{ScoredTransaction, Transaction};

/// Default model score threshold
pub const DEFAULT_THRESHOLD: f64 = 0.3;

/// A transaction is fraud when the model score is strictly above the
/// threshold or the producer labelled it as fraud.
pub fn is_fraud(prediction: f64, ground_truth: u8, threshold: f64) -> bool {
    prediction > threshold || ground_truth == 1
}

/// Applies the decision rule to classifier output.
#[derive(Debug, Clone, Copy)]
pub struct FraudDetector {
    threshold: f64,
}

impl FraudDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Combine a transaction with its model score. Scores outside [0, 1]
    /// (including NaN) are rejected.
    pub fn decide(&self, tx: &Transaction, prediction: f64) -> PipelineResult<ScoredTransaction> {
        if !(0.0..=1.0).contains(&prediction) {
            return Err(PipelineError::InvalidScore(prediction));
        }
        let flagged = is_fraud(prediction, tx.is_fraud, self.threshold);
        Ok(ScoredTransaction::new(tx, prediction, flagged))
    }
}

impl Default for FraudDetector {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}
