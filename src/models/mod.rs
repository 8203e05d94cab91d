//! Fraud classifier backends

pub mod dense;
#[cfg(feature = "onnx")]
pub mod onnx;

use crate::config::{ModelConfig, ModelFormat};
use crate::error::PipelineResult;
use crate::feature_extractor::FEATURE_COUNT;
use anyhow::Result;

pub use dense::DenseNetwork;
#[cfg(feature = "onnx")]
pub use onnx::OnnxClassifier;

/// Pretrained binary classifier consuming the fixed feature vector
pub trait Classifier: Send {
    /// Model name for logs
    fn name(&self) -> &str;

    /// Number of inputs the model expects
    fn input_size(&self) -> usize;

    /// Fraud probability for one feature vector
    fn predict(&mut self, features: &[f32]) -> PipelineResult<f64>;
}

/// Load the classifier named by the configuration
pub fn load_classifier(config: &ModelConfig) -> Result<Box<dyn Classifier>> {
    match config.format {
        ModelFormat::Dense => Ok(Box::new(DenseNetwork::load(&config.path, FEATURE_COUNT)?)),
        #[cfg(feature = "onnx")]
        ModelFormat::Onnx => Ok(Box::new(OnnxClassifier::load(
            &config.path,
            FEATURE_COUNT,
            config.onnx_threads,
        )?)),
        #[cfg(not(feature = "onnx"))]
        ModelFormat::Onnx => anyhow::bail!(
            "model format 'onnx' requires building with `--features onnx` ({})",
            config.path.display()
        ),
    }
}
