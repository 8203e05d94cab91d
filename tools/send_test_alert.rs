//! Send a single SMS through the configured Twilio account to check
//! credentials end to end.

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use fraud_stream::{
    alerting::{format_alert, AlertDispatcher},
    config::{AppConfig, DEFAULT_CONFIG_PATH},
    telemetry,
    types::ScoredTransaction,
};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "send-test-alert", version, about = "Send a test SMS alert")]
struct Args {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Message body; defaults to a sample fraud alert
    #[arg(long)]
    message: Option<String>,
}

fn sample_alert() -> String {
    format_alert(&ScoredTransaction {
        id: uuid::Uuid::new_v4().to_string(),
        timestamp: Local::now().naive_local(),
        amount: 1234.56,
        prediction: 0.95,
        is_fraud: true,
        ground_truth: false,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::load_from_path(&args.config)?;
    telemetry::init_tracing(&config.logging)?;

    let dispatcher = AlertDispatcher::from_config(&config.alerting)?;
    let message = args.message.unwrap_or_else(sample_alert);

    info!("Sending test alert");
    if dispatcher.send(&message).await {
        info!("Test alert sent");
        Ok(())
    } else {
        error!("Test alert was not delivered");
        anyhow::bail!("test alert failed")
    }
}
