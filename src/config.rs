//! Configuration management for the fraud pipeline

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Prefix for environment overrides, e.g. `FRAUD_STREAM__DETECTION__THRESHOLD=0.5`
pub const ENV_PREFIX: &str = "FRAUD_STREAM";

/// Classifier artifact format
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    /// Dense network weights exported as JSON
    #[default]
    Dense,
    /// ONNX graph, requires the `onnx` feature
    Onnx,
}

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub producer: ProducerConfig,
    pub detection: DetectionConfig,
    pub model: ModelConfig,
    pub dashboard: DashboardConfig,
    pub alerting: AlertingConfig,
    pub logging: LoggingConfig,
}

/// Shared transaction directory
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory both producer and consumer point at
    pub dir: PathBuf,
    /// Files older than this are swept regardless of state
    pub max_file_age_secs: u64,
    /// Sleep between consumer polls
    pub poll_interval_ms: u64,
    /// Sleep after a failed loop iteration
    pub error_backoff_ms: u64,
}

impl StoreConfig {
    pub fn max_file_age(&self) -> Duration {
        Duration::from_secs(self.max_file_age_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("transactions"),
            max_file_age_secs: 3600,
            poll_interval_ms: 100,
            error_backoff_ms: 1000,
        }
    }
}

/// Synthetic transaction producer
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    /// Reference dataset rows are sampled from
    pub dataset_path: PathBuf,
    /// Lower bound of the random delay between transactions
    pub min_delay_ms: u64,
    /// Upper bound of the random delay between transactions
    pub max_delay_ms: u64,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("data/creditcard.csv"),
            min_delay_ms: 200,
            max_delay_ms: 500,
        }
    }
}

/// Detection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Model score above which a transaction is flagged
    pub threshold: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self { threshold: 0.3 }
    }
}

/// Classifier artifact
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
    pub format: ModelFormat,
    /// Intra-op threads for ONNX inference
    pub onnx_threads: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("model/fraud_model.json"),
            format: ModelFormat::Dense,
            onnx_threads: 1,
        }
    }
}

/// Dashboard rendering and serving
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Address the dashboard HTTP server binds to
    pub bind: String,
    /// Minimum wall-clock time between snapshot refreshes
    pub refresh_interval_ms: u64,
    /// Transactions kept for the scatter plot
    pub history_size: usize,
    /// Rows in the recent transactions table
    pub recent_rows: usize,
    /// Failures kept for the error panel
    pub error_log_size: usize,
    /// Interval of the boxed metrics summary in the log
    pub summary_interval_secs: u64,
}

impl DashboardConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8501".to_string(),
            refresh_interval_ms: 500,
            history_size: 100,
            recent_rows: 10,
            error_log_size: 20,
            summary_interval_secs: 30,
        }
    }
}

/// SMS alerting
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertingConfig {
    /// Turn alert dispatch off entirely
    pub enabled: bool,
    /// HTTP timeout for the messaging API
    pub timeout_secs: u64,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 15,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path, layered with environment
    /// overrides. A missing file falls back to defaults.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.detection.threshold) {
            anyhow::bail!(
                "detection.threshold must be within [0, 1], got {}",
                self.detection.threshold
            );
        }
        if self.producer.min_delay_ms > self.producer.max_delay_ms {
            anyhow::bail!("producer.min_delay_ms must not exceed producer.max_delay_ms");
        }
        if self.dashboard.history_size == 0 {
            anyhow::bail!("dashboard.history_size must be positive");
        }
        Ok(())
    }
}
