//! Fraud alert data structures

use crate::types::transaction::ScoredTransaction;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alert raised for a transaction the pipeline flagged as fraud
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudAlert {
    /// Unique alert identifier
    pub alert_id: String,

    /// Associated transaction ID
    pub transaction_id: String,

    /// Transaction amount
    pub amount: f64,

    /// Classifier probability (0.0 - 1.0)
    pub probability: f64,

    /// Whether the producer's label alone would have flagged it
    pub ground_truth: bool,

    /// When the transaction happened
    pub transaction_time: NaiveDateTime,

    /// Alert generation timestamp
    pub timestamp: DateTime<Utc>,
}

impl FraudAlert {
    /// Create an alert from a scored transaction
    pub fn from_scored(tx: &ScoredTransaction) -> Self {
        Self {
            alert_id: uuid::Uuid::new_v4().to_string(),
            transaction_id: tx.id.clone(),
            amount: tx.amount,
            probability: tx.prediction,
            ground_truth: tx.ground_truth,
            transaction_time: tx.timestamp,
            timestamp: Utc::now(),
        }
    }

    /// SMS body for this alert
    pub fn message(&self) -> String {
        format!(
            "🚨 FRAUD ALERT 🚨\nAmount: ${:.2}\nTime: {}\nFraud Probability: {:.2}%\nTransaction ID: {}",
            self.amount,
            self.transaction_time.format("%Y-%m-%dT%H:%M:%S"),
            self.probability * 100.0,
            self.transaction_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn scored(prediction: f64) -> ScoredTransaction {
        ScoredTransaction {
            id: "tx_123".to_string(),
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 14)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            amount: 1000.0,
            prediction,
            is_fraud: true,
            ground_truth: false,
        }
    }

    #[test]
    fn test_alert_message() {
        let alert = FraudAlert::from_scored(&scored(0.9512));
        let msg = alert.message();

        assert!(msg.starts_with("🚨 FRAUD ALERT 🚨"));
        assert!(msg.contains("Amount: $1000.00"));
        assert!(msg.contains("Time: 2024-03-14T12:00:00"));
        assert!(msg.contains("Fraud Probability: 95.12%"));
        assert!(msg.contains("Transaction ID: tx_123"));
    }

    #[test]
    fn test_fraud_alert_serialization() {
        let alert = FraudAlert::from_scored(&scored(0.78));

        let json = serde_json::to_string(&alert).unwrap();
        let deserialized: FraudAlert = serde_json::from_str(&json).unwrap();

        assert_eq!(alert.transaction_id, deserialized.transaction_id);
        assert_eq!(alert.probability, deserialized.probability);
        assert_eq!(alert.transaction_time, deserialized.transaction_time);
    }
}
