//! Inference Engine Implementation

use crate::model::{ModelConfig, RulModel, RulNetwork};
use crate::onnx::OnnxModel;
use crate::InferenceError;
use feature_engine::FrequencyConfig;
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// RUL estimate for one input window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulPrediction {
    /// Remaining useful life in cycles (mean over channels, not below zero)
    pub rul: f64,
    /// Raw per-channel estimates
    pub per_channel: Vec<f64>,
    /// Timestamp when prediction was made
    pub timestamp_ms: u64,
}

/// Result of inference operation
#[derive(Debug, Clone)]
pub struct InferenceResult {
    /// The prediction
    pub prediction: RulPrediction,
    /// Inference latency in milliseconds
    pub latency_ms: u64,
}

/// Runs a RUL model on frequency-matrix input
pub struct InferenceEngine {
    model: Box<dyn RulModel>,
    /// Expected `(H, F)` of every channel
    input_shape: (usize, usize),
}

impl InferenceEngine {
    /// Wrap an already built model
    pub fn new(model: Box<dyn RulModel>, frequency: &FrequencyConfig) -> Self {
        info!("Creating inference engine with model: {}", model.name());
        Self {
            model,
            input_shape: (frequency.rows(), frequency.bins()),
        }
    }

    /// ONNX artifact when `model_path` is set, else the seeded native network
    pub fn from_config(config: &ModelConfig, frequency: &FrequencyConfig) -> Result<Self, InferenceError> {
        let model: Box<dyn RulModel> = match &config.model_path {
            Some(path) => Box::new(OnnxModel::load(path, frequency.rows() * frequency.bins())?),
            None => Box::new(RulNetwork::seeded(config, frequency)?),
        };
        Ok(Self::new(model, frequency))
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Expected `(H, F)` per channel
    pub fn input_shape(&self) -> (usize, usize) {
        self.input_shape
    }

    /// Run inference on a `[C, H, F]` frequency-magnitude input
    pub fn predict(&self, input: &Array3<f64>) -> Result<InferenceResult, InferenceError> {
        let start = std::time::Instant::now();

        let (channels, rows, bins) = input.dim();
        if channels == 0 || (rows, bins) != self.input_shape {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("[C>0, {}, {}]", self.input_shape.0, self.input_shape.1),
                actual: format!("{:?}", input.dim()),
            });
        }

        let per_channel = self.model.predict(input)?;
        if per_channel.len() != channels {
            return Err(InferenceError::InferenceFailed(format!(
                "model returned {} values for {} channels",
                per_channel.len(),
                channels
            )));
        }

        let mean = per_channel.sum() / channels as f64;
        // NaN stays NaN so callers can report an unknown state
        let rul = if mean.is_finite() { mean.max(0.0) } else { mean };
        if !rul.is_finite() {
            warn!("Model {} produced a non-finite RUL", self.model.name());
        }

        let timestamp_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let latency_ms = start.elapsed().as_millis() as u64;
        debug!("Inference completed in {}ms (rul={:.2})", latency_ms, rul);

        Ok(InferenceResult {
            prediction: RulPrediction {
                rul,
                per_channel: per_channel.to_vec(),
                timestamp_ms,
            },
            latency_ms,
        })
    }
}
