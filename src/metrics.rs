//! Running aggregates for the scoring loop.
//!
//! The aggregator is owned by the scoring loop and mutated in place; the
//! dashboard only ever sees snapshots derived from it.

use crate::dashboard::DashboardSnapshot;
use crate::error::PipelineError;
use crate::types::transaction::ScoredTransaction;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::info;

/// Default number of transactions kept for charting
pub const DEFAULT_HISTORY_SIZE: usize = 100;

/// Default number of failures kept for the error panel
pub const DEFAULT_ERROR_LOG_SIZE: usize = 20;

/// A file the loop could not process
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub file: String,
    pub kind: &'static str,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Point-in-time view of the counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub total_transactions: u64,
    pub fraud_count: u64,
    /// Percentage of processed transactions flagged as fraud
    pub fraud_rate: f64,
    pub total_amount: f64,
    pub fraud_amount: f64,
    pub legit_amount: f64,
    pub failed_files: u64,
    pub alerts_sent: u64,
    pub alerts_failed: u64,
    /// Transactions per second since start
    pub throughput: f64,
}

/// Counters, bounded transaction history and bounded error log
#[derive(Debug)]
pub struct Aggregator {
    total_transactions: u64,
    fraud_count: u64,
    total_amount: f64,
    fraud_amount: f64,
    legit_amount: f64,
    failed_files: u64,
    alerts_sent: u64,
    alerts_failed: u64,
    history: VecDeque<ScoredTransaction>,
    history_size: usize,
    errors: VecDeque<ErrorRecord>,
    error_log_size: usize,
    start_time: Instant,
}

impl Aggregator {
    pub fn new(history_size: usize, error_log_size: usize) -> Self {
        Self {
            total_transactions: 0,
            fraud_count: 0,
            total_amount: 0.0,
            fraud_amount: 0.0,
            legit_amount: 0.0,
            failed_files: 0,
            alerts_sent: 0,
            alerts_failed: 0,
            history: VecDeque::with_capacity(history_size),
            history_size,
            errors: VecDeque::with_capacity(error_log_size),
            error_log_size,
            start_time: Instant::now(),
        }
    }

    /// Record a scored transaction
    pub fn record(&mut self, tx: ScoredTransaction) {
        self.total_transactions += 1;
        self.total_amount += tx.amount;

        if tx.is_fraud {
            self.fraud_count += 1;
            self.fraud_amount += tx.amount;
        } else {
            self.legit_amount += tx.amount;
        }

        if self.history_size == 0 {
            return;
        }
        if self.history.len() == self.history_size {
            self.history.pop_front();
        }
        self.history.push_back(tx);
    }

    /// Record a file that failed to process
    pub fn record_failure(&mut self, file: &str, error: &PipelineError) {
        self.failed_files += 1;

        if self.error_log_size == 0 {
            return;
        }
        if self.errors.len() == self.error_log_size {
            self.errors.pop_front();
        }
        self.errors.push_back(ErrorRecord {
            file: file.to_string(),
            kind: error.kind(),
            message: error.to_string(),
            at: Utc::now(),
        });
    }

    /// Record the outcome of an alert dispatch
    pub fn record_alert(&mut self, delivered: bool) {
        if delivered {
            self.alerts_sent += 1;
        } else {
            self.alerts_failed += 1;
        }
    }

    /// Most recent transactions, oldest first
    pub fn history(&self) -> impl Iterator<Item = &ScoredTransaction> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Up to `n` most recent transactions, oldest first
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &ScoredTransaction> {
        self.history.iter().skip(self.history.len().saturating_sub(n))
    }

    /// Recent failures, oldest first
    pub fn errors(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.errors.iter()
    }

    /// Get current throughput (transactions per second)
    pub fn throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.total_transactions as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let fraud_rate = if self.total_transactions > 0 {
            self.fraud_count as f64 / self.total_transactions as f64 * 100.0
        } else {
            0.0
        };

        MetricsSummary {
            total_transactions: self.total_transactions,
            fraud_count: self.fraud_count,
            fraud_rate,
            total_amount: self.total_amount,
            fraud_amount: self.fraud_amount,
            legit_amount: self.legit_amount,
            failed_files: self.failed_files,
            alerts_sent: self.alerts_sent,
            alerts_failed: self.alerts_failed,
            throughput: self.throughput(),
        }
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE, DEFAULT_ERROR_LOG_SIZE)
    }
}

/// Print summary statistics
pub fn log_summary(summary: &MetricsSummary) {
    info!("╔══════════════════════════════════════════════════════════════╗");
    info!("║              FRAUD STREAM - METRICS SUMMARY                  ║");
    info!("╠══════════════════════════════════════════════════════════════╣");
    info!(
        "║ Transactions Processed: {:>8}  │  Throughput: {:>6.1} tx/s ║",
        summary.total_transactions, summary.throughput
    );
    info!(
        "║ Flagged as Fraud:       {:>8}  │  Fraud Rate: {:>6.1}%     ║",
        summary.fraud_count, summary.fraud_rate
    );
    info!("╠══════════════════════════════════════════════════════════════╣");
    info!("║ Total Amount:      ${:>14.2}                            ║", summary.total_amount);
    info!("║ Fraud Amount:      ${:>14.2}                            ║", summary.fraud_amount);
    info!("║ Legitimate Amount: ${:>14.2}                            ║", summary.legit_amount);
    info!("╠══════════════════════════════════════════════════════════════╣");
    info!(
        "║ Alerts sent: {:>6}  failed: {:>6}  │  Failed files: {:>6}  ║",
        summary.alerts_sent, summary.alerts_failed, summary.failed_files
    );
    info!("╚══════════════════════════════════════════════════════════════╝");
}

/// Periodically logs the latest published summary
pub struct MetricsReporter {
    snapshots: watch::Receiver<DashboardSnapshot>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(snapshots: watch::Receiver<DashboardSnapshot>, interval_secs: u64) -> Self {
        Self {
            snapshots,
            interval_secs,
        }
    }

    /// Start the periodic reporting task; returns when the loop drops its sender
    pub async fn start(mut self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // first tick completes immediately
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let summary = self.snapshots.borrow().summary.clone();
                    log_summary(&summary);
                }
                changed = self.snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn scored(id: usize, amount: f64, is_fraud: bool) -> ScoredTransaction {
        ScoredTransaction {
            id: format!("tx_{id}"),
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 14)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            amount,
            prediction: if is_fraud { 0.9 } else { 0.1 },
            is_fraud,
            ground_truth: false,
        }
    }

    #[test]
    fn test_counters() {
        let mut agg = Aggregator::default();
        agg.record(scored(1, 100.0, false));
        agg.record(scored(2, 50.0, true));
        agg.record(scored(3, 25.5, false));
        agg.record_alert(true);
        agg.record_alert(false);

        let summary = agg.summary();
        assert_eq!(summary.total_transactions, 3);
        assert_eq!(summary.fraud_count, 1);
        assert!((summary.fraud_rate - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.total_amount, 175.5);
        assert_eq!(summary.fraud_amount, 50.0);
        assert_eq!(summary.legit_amount, 125.5);
        assert_eq!(summary.alerts_sent, 1);
        assert_eq!(summary.alerts_failed, 1);
    }

    #[test]
    fn test_empty_summary() {
        let summary = Aggregator::default().summary();
        assert_eq!(summary.total_transactions, 0);
        assert_eq!(summary.fraud_rate, 0.0);
    }

    #[test]
    fn test_history_evicts_oldest() {
        let mut agg = Aggregator::default();
        for i in 0..100 {
            agg.record(scored(i, 1.0, false));
        }
        assert_eq!(agg.history_len(), 100);
        assert_eq!(agg.history().next().unwrap().id, "tx_0");

        agg.record(scored(100, 1.0, false));
        assert_eq!(agg.history_len(), 100);
        assert_eq!(agg.history().next().unwrap().id, "tx_1");
        assert_eq!(agg.history().last().unwrap().id, "tx_100");
        // counters are not windowed
        assert_eq!(agg.summary().total_transactions, 101);
    }

    #[test]
    fn test_zero_history_keeps_nothing() {
        let mut agg = Aggregator::new(0, 0);
        for i in 0..3 {
            agg.record(scored(i, 2.0, i == 1));
        }
        assert_eq!(agg.history_len(), 0);
        assert_eq!(agg.recent(10).count(), 0);

        let summary = agg.summary();
        assert_eq!(summary.total_transactions, 3);
        assert_eq!(summary.fraud_amount, 2.0);
        assert_eq!(summary.legit_amount, 4.0);
    }

    #[test]
    fn test_recent_window() {
        let mut agg = Aggregator::default();
        for i in 0..15 {
            agg.record(scored(i, 1.0, false));
        }
        let ids: Vec<_> = agg.recent(10).map(|t| t.id.clone()).collect();
        assert_eq!(ids.len(), 10);
        assert_eq!(ids[0], "tx_5");
        assert_eq!(ids[9], "tx_14");

        assert_eq!(agg.recent(50).count(), 15);
    }

    #[test]
    fn test_error_log_is_bounded() {
        let mut agg = Aggregator::new(10, 2);
        for i in 0..3 {
            agg.record_failure(&format!("transaction_{i}.json"), &PipelineError::InvalidScore(2.0));
        }
        let files: Vec<_> = agg.errors().map(|e| e.file.clone()).collect();
        assert_eq!(files, vec!["transaction_1.json", "transaction_2.json"]);
        assert_eq!(agg.summary().failed_files, 3);
        assert_eq!(agg.errors().next().unwrap().kind, "invalid_score");
    }
}
