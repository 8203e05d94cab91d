//! fraud-stream - scoring loop entry point
//!
//! Polls the transaction directory, scores each transaction, serves the live
//! dashboard and sends SMS alerts for flagged transactions.

use anyhow::{Context, Result};
use clap::Parser;
use fraud_stream::{
    alerting::AlertDispatcher,
    config::{AppConfig, DEFAULT_CONFIG_PATH},
    consumer::ScoringLoop,
    dashboard::{self, DashboardPublisher},
    feature_extractor::FeatureExtractor,
    metrics::MetricsReporter,
    models::load_classifier,
    store::TransactionStore,
    telemetry,
};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "fraud-stream", version, about = "Score transactions and serve the fraud dashboard")]
struct Args {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::load_from_path(&args.config)?;
    telemetry::init_tracing(&config.logging)?;

    info!("Starting fraud-stream");
    info!(
        config = %args.config.display(),
        threshold = config.detection.threshold,
        dir = %config.store.dir.display(),
        "Configuration loaded"
    );

    let extractor = FeatureExtractor::new();
    let classifier = load_classifier(&config.model)
        .with_context(|| format!("Failed to load model {}", config.model.path.display()))?;
    info!(
        model = classifier.name(),
        inputs = classifier.input_size(),
        features = extractor.feature_count(),
        "Classifier loaded"
    );

    let store = TransactionStore::open(&config.store.dir).await?;

    let (publisher, snapshots) = DashboardPublisher::new(
        config.dashboard.refresh_interval(),
        config.dashboard.recent_rows,
    );

    let bind = config.dashboard.bind.clone();
    let server_rx = snapshots.clone();
    tokio::spawn(async move {
        if let Err(e) = dashboard::serve(&bind, server_rx).await {
            error!(error = %e, "Dashboard server failed");
        }
    });

    let reporter = MetricsReporter::new(snapshots, config.dashboard.summary_interval_secs);
    tokio::spawn(reporter.start());

    let mut scoring = ScoringLoop::new(store, classifier, publisher, &config);
    if config.alerting.enabled {
        scoring = scoring.with_alerts(AlertDispatcher::from_config(&config.alerting)?);
    } else {
        info!("SMS alerts disabled");
    }

    scoring.run().await;
    Ok(())
}
