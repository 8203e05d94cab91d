//! Feed-forward network classifier loaded from exported dense-layer weights.
//!
//! The artifact is a JSON document listing the layers of a Keras-style
//! `Sequential` model. Kernels are stored `[inputs][units]`, the layout
//! `layer.get_weights()[0]` produces. Dropout layers are inference no-ops and
//! are simply left out of the export.

use crate::error::{PipelineError, PipelineResult};
use crate::models::Classifier;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Sigmoid,
    Tanh,
    Linear,
}

impl Activation {
    fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Tanh => x.tanh(),
            Activation::Linear => x,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    pub kernel: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
    pub activation: Activation,
}

impl DenseLayer {
    fn inputs(&self) -> usize {
        self.kernel.len()
    }

    fn units(&self) -> usize {
        self.bias.len()
    }

    fn forward(&self, input: &[f32]) -> Vec<f32> {
        let mut out = self.bias.clone();
        for (x, row) in input.iter().zip(&self.kernel) {
            for (acc, w) in out.iter_mut().zip(row) {
                *acc += x * w;
            }
        }
        for v in out.iter_mut() {
            *v = self.activation.apply(*v);
        }
        out
    }
}

/// Dense network producing a single fraud probability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseNetwork {
    #[serde(default = "default_name")]
    pub name: String,
    pub layers: Vec<DenseLayer>,
}

fn default_name() -> String {
    "dense".to_string()
}

impl DenseNetwork {
    /// Load and validate a network from a JSON artifact
    pub fn load<P: AsRef<Path>>(path: P, expected_inputs: usize) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading dense model");

        let raw = std::fs::read(path)
            .with_context(|| format!("Failed to read model from {}", path.display()))?;
        let network: DenseNetwork = serde_json::from_slice(&raw)
            .with_context(|| format!("Failed to parse model {}", path.display()))?;
        network.validate(expected_inputs)?;

        info!(
            model = %network.name,
            layers = network.layers.len(),
            inputs = expected_inputs,
            "Model loaded successfully"
        );
        Ok(network)
    }

    /// Check that layer shapes chain from `expected_inputs` down to one output
    pub fn validate(&self, expected_inputs: usize) -> Result<()> {
        let Some(first) = self.layers.first() else {
            anyhow::bail!("model {} has no layers", self.name);
        };
        if first.inputs() != expected_inputs {
            anyhow::bail!(
                "model {} takes {} inputs, feature vector has {}",
                self.name,
                first.inputs(),
                expected_inputs
            );
        }

        let mut width = expected_inputs;
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.inputs() != width {
                anyhow::bail!("layer {} expects {} inputs, previous layer has {}", i, layer.inputs(), width);
            }
            if let Some(row) = layer.kernel.iter().position(|r| r.len() != layer.units()) {
                anyhow::bail!(
                    "layer {} kernel row {} has {} units, bias has {}",
                    i,
                    row,
                    layer.kernel[row].len(),
                    layer.units()
                );
            }
            width = layer.units();
        }

        if width != 1 {
            anyhow::bail!("model {} must end in a single output, got {}", self.name, width);
        }
        Ok(())
    }

    fn input_width(&self) -> usize {
        self.layers.first().map(DenseLayer::inputs).unwrap_or(0)
    }
}

impl Classifier for DenseNetwork {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_size(&self) -> usize {
        self.input_width()
    }

    fn predict(&mut self, features: &[f32]) -> PipelineResult<f64> {
        if features.len() != self.input_width() {
            return Err(PipelineError::FeatureShape {
                expected: self.input_width(),
                actual: features.len(),
            });
        }

        let mut activations = features.to_vec();
        for layer in &self.layers {
            activations = layer.forward(&activations);
        }

        activations
            .first()
            .map(|&p| p as f64)
            .ok_or_else(|| PipelineError::Classifier("model produced no output".to_string()))
    }
}
