//! Transaction Producer
//!
//! Writes synthetic transactions into the shared directory for the scoring
//! loop to pick up.

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use fraud_stream::{
    config::{AppConfig, DEFAULT_CONFIG_PATH},
    generator::{ReferenceDataset, TransactionGenerator},
    store::TransactionStore,
    telemetry,
    types::transaction::{short_id, Transaction},
};
use rand::Rng;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "transaction-producer", version, about = "Generate synthetic transactions")]
struct Args {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Stop after this many transactions
    #[arg(long)]
    count: Option<u64>,

    /// Log transactions instead of writing them
    #[arg(long)]
    dry_run: bool,
}

/// Write `tx`, or print it on a dry run. Returns whether it counts as produced.
async fn save(store: &TransactionStore, tx: &Transaction, dry_run: bool) -> Result<bool> {
    if dry_run {
        info!("Dry run transaction:\n{}", serde_json::to_string_pretty(tx)?);
        return Ok(true);
    }
    match store.write(tx).await {
        Ok(_) => Ok(true),
        Err(e) => {
            error!(transaction_id = %tx.id, error = %e, "Failed to write transaction");
            Ok(false)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::load_from_path(&args.config)?;
    telemetry::init_tracing(&config.logging)?;

    info!("Starting Transaction Producer");

    let dataset = ReferenceDataset::load(&config.producer.dataset_path)?;
    let generator = TransactionGenerator::new(dataset);
    let store = TransactionStore::open(&config.store.dir).await?;

    info!(
        dir = %store.dir().display(),
        count = ?args.count,
        dry_run = args.dry_run,
        "Producer configured"
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut produced: u64 = 0;
    let mut frauds: u64 = 0;

    loop {
        if args.count.is_some_and(|n| produced >= n) {
            break;
        }

        let (tx, delay) = {
            let mut rng = rand::thread_rng();
            let tx = generator.generate(&mut rng, Local::now().naive_local());
            let delay = rng.gen_range(config.producer.min_delay_ms..=config.producer.max_delay_ms);
            (tx, Duration::from_millis(delay))
        };

        if save(&store, &tx, args.dry_run).await? {
            produced += 1;
            if tx.ground_truth() {
                frauds += 1;
            }
            info!(
                "Generated {} transaction: ${:.2} (ID: {})",
                if tx.ground_truth() { "FRAUD" } else { "LEGIT" },
                tx.amount,
                short_id(&tx.id)
            );
        }

        if !args.dry_run {
            match store
                .sweep_older_than(config.store.max_file_age(), SystemTime::now())
                .await
            {
                Ok(removed) if !removed.is_empty() => {
                    info!(count = removed.len(), "Removed stale transaction files");
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Failed to sweep transaction directory"),
            }
        }

        tokio::select! {
            _ = &mut shutdown => {
                info!("Stopping transaction generation...");
                break;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }

    info!(produced, frauds, "Producer finished");
    Ok(())
}
