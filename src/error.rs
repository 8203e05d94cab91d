//! Per-file failure taxonomy for the scoring pipeline

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Reason a single transaction file could not be produced or consumed.
///
/// None of these are fatal: the loop records them and moves on.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed transaction file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("transaction {path} has amount {amount}, expected a positive number")]
    InvalidAmount { path: PathBuf, amount: f64 },

    #[error("classifier failed: {0}")]
    Classifier(String),

    #[error("classifier returned {0}, expected a probability in [0, 1]")]
    InvalidScore(f64),

    #[error("feature vector has {actual} inputs, model expects {expected}")]
    FeatureShape { expected: usize, actual: usize },
}

impl PipelineError {
    /// Short machine-friendly label used in logs and on the dashboard
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Read { .. } => "read",
            PipelineError::Write { .. } => "write",
            PipelineError::Malformed { .. } => "malformed",
            PipelineError::InvalidAmount { .. } => "invalid_amount",
            PipelineError::Classifier(_) => "classifier",
            PipelineError::InvalidScore(_) => "invalid_score",
            PipelineError::FeatureShape { .. } => "feature_shape",
        }
    }

    /// True when the underlying cause is a file that disappeared between
    /// listing and reading, which the pipeline treats as benign.
    pub fn is_not_found(&self) -> bool {
        match self {
            PipelineError::Read { source, .. } | PipelineError::Write { source, .. } => {
                source.kind() == io::ErrorKind::NotFound
            }
            _ => false,
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
