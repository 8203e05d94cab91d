//! Scoring loop: polls the transaction directory, scores every new file and
//! keeps the running aggregates that feed the dashboard.

use crate::alerting::AlertDispatcher;
use crate::config::AppConfig;
use crate::dashboard::DashboardPublisher;
use crate::detector::FraudDetector;
use crate::error::{PipelineError, PipelineResult};
use crate::feature_extractor::FeatureExtractor;
use crate::metrics::{log_summary, Aggregator, MetricsSummary};
use crate::models::Classifier;
use crate::store::{PendingFile, TransactionStore};
use crate::types::alert::FraudAlert;
use crate::types::transaction::ScoredTransaction;
use std::collections::HashSet;
use std::future::Future;
use std::io;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, error, info, warn};

/// Counts for one pass over the directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    pub scored: usize,
    pub fraud: usize,
    pub failed: usize,
    pub duplicates: usize,
    pub swept: usize,
}

impl PollReport {
    pub fn is_idle(&self) -> bool {
        *self == PollReport::default()
    }
}

/// Single owner of the classifier, the aggregates and the set of ids
/// already scored by this process.
pub struct ScoringLoop {
    store: TransactionStore,
    extractor: FeatureExtractor,
    classifier: Box<dyn Classifier>,
    detector: FraudDetector,
    aggregator: Aggregator,
    seen: HashSet<String>,
    alerts: Option<AlertDispatcher>,
    publisher: DashboardPublisher,
    max_file_age: Duration,
    poll_interval: Duration,
    error_backoff: Duration,
}

impl ScoringLoop {
    pub fn new(
        store: TransactionStore,
        classifier: Box<dyn Classifier>,
        publisher: DashboardPublisher,
        config: &AppConfig,
    ) -> Self {
        Self {
            store,
            extractor: FeatureExtractor::new(),
            classifier,
            detector: FraudDetector::new(config.detection.threshold),
            aggregator: Aggregator::new(
                config.dashboard.history_size,
                config.dashboard.error_log_size,
            ),
            seen: HashSet::new(),
            alerts: None,
            publisher,
            max_file_age: config.store.max_file_age(),
            poll_interval: config.store.poll_interval(),
            error_backoff: config.store.error_backoff(),
        }
    }

    /// Send SMS alerts for flagged transactions
    pub fn with_alerts(mut self, dispatcher: AlertDispatcher) -> Self {
        self.alerts = Some(dispatcher);
        self
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn summary(&self) -> MetricsSummary {
        self.aggregator.summary()
    }

    /// Whether `id` was already scored by this process
    pub fn is_seen(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Score one file end to end, without touching any state
    async fn score_file(&mut self, file: &PendingFile) -> PipelineResult<ScoredTransaction> {
        let tx = self.store.read(&file.path).await?;
        // counters only ever grow
        if !(tx.amount.is_finite() && tx.amount > 0.0) {
            return Err(PipelineError::InvalidAmount {
                path: file.path.clone(),
                amount: tx.amount,
            });
        }
        let features = self.extractor.extract(&tx);
        let prediction = self.classifier.predict(&features)?;
        self.detector.decide(&tx, prediction)
    }

    /// One pass: score new files, drop duplicates, sweep stale files.
    ///
    /// Only listing and sweeping the directory can fail; per-file failures
    /// are recorded and the file stays for the next pass.
    pub async fn poll_once(&mut self) -> io::Result<PollReport> {
        let mut report = PollReport::default();

        for file in self.store.list_pending().await? {
            if self.seen.contains(&file.id) {
                debug!(transaction_id = %file.id, "Dropping already scored transaction");
                self.discard(&file).await;
                report.duplicates += 1;
                continue;
            }

            let scored = match self.score_file(&file).await {
                Ok(scored) => scored,
                Err(e) if e.is_not_found() => {
                    debug!(path = %file.path.display(), "Transaction file vanished before read");
                    continue;
                }
                Err(e) => {
                    warn!(
                        path = %file.path.display(),
                        kind = e.kind(),
                        error = %e,
                        "Failed to process transaction file"
                    );
                    let name = file
                        .path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| file.id.clone());
                    self.aggregator.record_failure(&name, &e);
                    report.failed += 1;
                    continue;
                }
            };

            if scored.is_fraud {
                report.fraud += 1;
                warn!(
                    transaction_id = %scored.id,
                    amount = scored.amount,
                    probability = scored.prediction,
                    ground_truth = scored.ground_truth,
                    "Fraud detected"
                );
                if let Some(dispatcher) = &self.alerts {
                    let delivered = dispatcher.dispatch(&FraudAlert::from_scored(&scored)).await;
                    self.aggregator.record_alert(delivered);
                }
            } else {
                debug!(
                    transaction_id = %scored.id,
                    amount = scored.amount,
                    probability = scored.prediction,
                    "Transaction scored"
                );
            }

            self.aggregator.record(scored);
            self.discard(&file).await;
            self.seen.insert(file.id);
            report.scored += 1;
        }

        let swept = self
            .store
            .sweep_older_than(self.max_file_age, SystemTime::now())
            .await?;
        if !swept.is_empty() {
            info!(count = swept.len(), "Removed stale transaction files");
        }
        report.swept = swept.len();

        Ok(report)
    }

    async fn discard(&self, file: &PendingFile) {
        if let Err(e) = self.store.remove(&file.path).await {
            warn!(path = %file.path.display(), error = %e, "Failed to delete transaction file");
        }
    }

    /// Republish the dashboard snapshot if the refresh interval has elapsed
    pub fn maybe_publish(&mut self, now: Instant) -> bool {
        self.publisher.maybe_publish(&self.aggregator, now)
    }

    /// Poll until Ctrl-C
    pub async fn run(&mut self) {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Poll until `shutdown` resolves. Iteration failures are logged and
    /// retried after the error backoff; the loop never exits on its own.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            dir = %self.store.dir().display(),
            model = self.classifier.name(),
            threshold = self.detector.threshold(),
            "Scoring loop started"
        );

        loop {
            let pause = match self.poll_once().await {
                Ok(report) => {
                    if !report.is_idle() {
                        debug!(?report, "Poll complete");
                    }
                    self.poll_interval
                }
                Err(e) => {
                    error!(error = %e, "Scoring iteration failed");
                    self.error_backoff
                }
            };
            self.maybe_publish(Instant::now());

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        self.publisher.publish(&self.aggregator);
        info!("Scoring loop shutting down");
        log_summary(&self.aggregator.summary());
    }
}
