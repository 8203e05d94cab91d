//! Live dashboard: snapshots of the aggregator, HTML rendering and the
//! HTTP server that exposes them.

pub mod render;
pub mod server;

use crate::metrics::{Aggregator, ErrorRecord, MetricsSummary};
use crate::types::transaction::{iso_timestamp, ScoredTransaction};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::sync::watch;

pub use render::render_page;
pub use server::{router, serve};

/// Default number of rows in the recent transactions table
pub const DEFAULT_RECENT_ROWS: usize = 10;

/// One dot on the scatter plot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub id: String,
    #[serde(with = "iso_timestamp")]
    pub timestamp: NaiveDateTime,
    pub amount: f64,
    pub prediction: f64,
    pub is_fraud: bool,
}

/// One row of the recent transactions table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentRow {
    pub timestamp: String,
    pub amount: f64,
    pub status: &'static str,
    pub probability: String,
    pub id: String,
}

impl From<&ScoredTransaction> for RecentRow {
    fn from(tx: &ScoredTransaction) -> Self {
        Self {
            timestamp: tx.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            amount: tx.amount,
            status: if tx.is_fraud { "FRAUD" } else { "LEGIT" },
            probability: format!("{:.2}%", tx.prediction * 100.0),
            id: tx.short_id(),
        }
    }
}

/// Everything the dashboard draws, detached from the aggregator
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub summary: MetricsSummary,
    /// History sorted by transaction time
    pub history: Vec<HistoryPoint>,
    pub recent: Vec<RecentRow>,
    pub errors: Vec<ErrorRecord>,
    pub generated_at: DateTime<Utc>,
}

impl DashboardSnapshot {
    pub fn empty() -> Self {
        Self {
            summary: MetricsSummary::default(),
            history: Vec::new(),
            recent: Vec::new(),
            errors: Vec::new(),
            generated_at: Utc::now(),
        }
    }

    pub fn from_aggregator(agg: &Aggregator, recent_rows: usize) -> Self {
        let mut history: Vec<HistoryPoint> = agg
            .history()
            .map(|tx| HistoryPoint {
                id: tx.id.clone(),
                timestamp: tx.timestamp,
                amount: tx.amount,
                prediction: tx.prediction,
                is_fraud: tx.is_fraud,
            })
            .collect();
        history.sort_by_key(|p| p.timestamp);

        Self {
            summary: agg.summary(),
            history,
            recent: agg.recent(recent_rows).map(RecentRow::from).collect(),
            errors: agg.errors().cloned().collect(),
            generated_at: Utc::now(),
        }
    }
}

impl Default for DashboardSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Publishes aggregator snapshots to the dashboard, at most once per interval
pub struct DashboardPublisher {
    sender: watch::Sender<DashboardSnapshot>,
    interval: Duration,
    last_publish: Option<Instant>,
    recent_rows: usize,
}

impl DashboardPublisher {
    /// Create a publisher and the receiver the server reads from
    pub fn new(interval: Duration, recent_rows: usize) -> (Self, watch::Receiver<DashboardSnapshot>) {
        let (sender, receiver) = watch::channel(DashboardSnapshot::empty());
        (
            Self {
                sender,
                interval,
                last_publish: None,
                recent_rows,
            },
            receiver,
        )
    }

    /// Another receiver on the same channel
    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.sender.subscribe()
    }

    /// Publish if at least `interval` passed since the last publish.
    /// Returns whether a snapshot went out.
    pub fn maybe_publish(&mut self, agg: &Aggregator, now: Instant) -> bool {
        let due = self
            .last_publish
            .map_or(true, |last| now.saturating_duration_since(last) >= self.interval);
        if due {
            self.publish(agg);
            self.last_publish = Some(now);
        }
        due
    }

    /// Publish unconditionally
    pub fn publish(&self, agg: &Aggregator) {
        self.sender
            .send_replace(DashboardSnapshot::from_aggregator(agg, self.recent_rows));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn scored(id: &str, hour: u32, amount: f64, is_fraud: bool) -> ScoredTransaction {
        ScoredTransaction {
            id: id.to_string(),
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 14)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            amount,
            prediction: 0.4567,
            is_fraud,
            ground_truth: false,
        }
    }

    #[test]
    fn test_recent_row_formatting() {
        let row = RecentRow::from(&scored("3f6c1a52-9a0e-4d51", 9, 12.5, true));
        assert_eq!(row.timestamp, "2024-03-14 09:00:00");
        assert_eq!(row.status, "FRAUD");
        assert_eq!(row.probability, "45.67%");
        assert_eq!(row.id, "3f6c1a52");
    }

    #[test]
    fn test_snapshot_sorts_history_by_time() {
        let mut agg = Aggregator::default();
        agg.record(scored("late", 15, 10.0, false));
        agg.record(scored("early", 8, 20.0, true));

        let snapshot = DashboardSnapshot::from_aggregator(&agg, DEFAULT_RECENT_ROWS);
        let ids: Vec<_> = snapshot.history.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);
        // table keeps arrival order
        assert_eq!(snapshot.recent[0].id, "late");
        assert_eq!(snapshot.summary.total_transactions, 2);
    }

    #[test]
    fn test_publisher_throttles() {
        let (mut publisher, rx) = DashboardPublisher::new(Duration::from_millis(500), 10);
        let mut agg = Aggregator::default();
        let start = Instant::now();

        assert!(publisher.maybe_publish(&agg, start));
        agg.record(scored("a", 10, 1.0, false));
        assert!(!publisher.maybe_publish(&agg, start + Duration::from_millis(200)));
        assert_eq!(rx.borrow().summary.total_transactions, 0);

        assert!(publisher.maybe_publish(&agg, start + Duration::from_millis(500)));
        assert_eq!(rx.borrow().summary.total_transactions, 1);
    }
}
