//! ONNX Runtime classifier backend

use crate::error::{PipelineError, PipelineResult};
use crate::models::Classifier;
use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;
use tracing::{debug, info};

/// Binary classifier backed by an ONNX session
pub struct OnnxClassifier {
    name: String,
    session: Session,
    input_name: String,
    output_name: String,
    input_size: usize,
}

impl OnnxClassifier {
    /// Load a model file with the given number of intra-op threads
    pub fn load<P: AsRef<Path>>(path: P, input_size: usize, threads: usize) -> Result<Self> {
        let path = path.as_ref();
        ort::init().commit()?;

        info!(path = %path.display(), threads = threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(threads)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "input".to_string());

        // Keras exports name the sigmoid output after the last layer, so
        // prefer anything that looks like a probability, then the last output.
        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob") || o.name.contains("output"))
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .unwrap_or_else(|| "output".to_string());

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("onnx")
            .to_string();

        info!(
            model = %name,
            input = %input_name,
            output = %output_name,
            "Model loaded successfully"
        );

        Ok(Self {
            name,
            session,
            input_name,
            output_name,
            input_size,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn predict(&mut self, features: &[f32]) -> PipelineResult<f64> {
        if features.len() != self.input_size {
            return Err(PipelineError::FeatureShape {
                expected: self.input_size,
                actual: features.len(),
            });
        }

        // shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features.to_vec()))
            .map_err(|e| PipelineError::Classifier(format!("failed to create input tensor: {e}")))?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| PipelineError::Classifier(e.to_string()))?;

        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| PipelineError::Classifier(format!("missing output {}", self.output_name)))?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| PipelineError::Classifier(e.to_string()))?;

        let dims: Vec<i64> = shape.iter().copied().collect();
        let prob = fraud_probability(&dims, data)
            .ok_or_else(|| PipelineError::Classifier("empty output tensor".to_string()))?;

        debug!(model = %self.name, prob = prob, "Extracted from tensor");
        Ok(prob)
    }
}

/// Pick the fraud-class probability out of a `[batch, classes]` or
/// `[classes]` tensor. Single-column outputs are already the probability.
fn fraud_probability(dims: &[i64], data: &[f32]) -> Option<f64> {
    let classes = dims.last().copied().unwrap_or(0);
    let value = if classes >= 2 { data.get(1) } else { data.first() };
    value.or_else(|| data.last()).map(|&v| v as f64)
}
