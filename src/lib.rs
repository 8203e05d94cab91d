//! fraud-stream
//!
//! A file-queue fraud pipeline: a producer drops synthetic transactions into
//! a directory, a scoring loop picks them up, classifies them, keeps running
//! aggregates for a live dashboard and sends SMS alerts for flagged ones.

pub mod alerting;
pub mod config;
pub mod consumer;
pub mod dashboard;
pub mod detector;
pub mod error;
pub mod feature_extractor;
pub mod generator;
pub mod metrics;
pub mod models;
pub mod store;
pub mod telemetry;
pub mod types;

pub use alerting::AlertDispatcher;
pub use config::AppConfig;
pub use consumer::{PollReport, ScoringLoop};
pub use detector::FraudDetector;
pub use error::{PipelineError, PipelineResult};
pub use feature_extractor::FeatureExtractor;
pub use generator::{ReferenceDataset, TransactionGenerator};
pub use models::Classifier;
pub use store::TransactionStore;
pub use types::{alert::FraudAlert, transaction::ScoredTransaction, transaction::Transaction};
