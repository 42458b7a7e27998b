//! ONNX Model Artifact
//!
//! An exported regressor taking one channel's flattened `[H·F]` frequency
//! magnitudes as a `[1, H·F]` f32 tensor and returning a scalar.

use crate::model::RulModel;
use crate::InferenceError;
use ndarray::{Array1, Array3, Axis};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use tract_onnx::prelude::*;

type Plan = TypedRunnableModel<TypedModel>;

pub struct OnnxModel {
    path: PathBuf,
    input_len: usize,
    plan: Plan,
}

impl std::fmt::Debug for OnnxModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxModel")
            .field("path", &self.path)
            .field("input_len", &self.input_len)
            .finish()
    }
}

impl OnnxModel {
    /// Load and optimize the artifact for `input_len` features per channel
    pub fn load(path: &Path, input_len: usize) -> Result<Self, InferenceError> {
        if !path.exists() {
            error!("Model file not found: {}", path.display());
            return Err(InferenceError::ModelLoadError(format!(
                "model file not found: {}",
                path.display()
            )));
        }

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, input_len]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| InferenceError::ModelLoadError(e.to_string()))?;

        info!("Loaded ONNX model {} (input [1, {}])", path.display(), input_len);
        Ok(Self {
            path: path.to_path_buf(),
            input_len,
            plan,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn input_len(&self) -> usize {
        self.input_len
    }

    fn run_channel(&self, features: &[f32]) -> Result<f64, InferenceError> {
        let tensor = Tensor::from_shape::<f32>(&[1, self.input_len], features)
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;
        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let output = outputs
            .first()
            .ok_or_else(|| InferenceError::InferenceFailed("model produced no outputs".to_string()))?;
        let values = output
            .as_slice::<f32>()
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;
        values
            .first()
            .map(|&v| v as f64)
            .ok_or_else(|| InferenceError::InferenceFailed("empty model output".to_string()))
    }
}

impl RulModel for OnnxModel {
    fn name(&self) -> &str {
        "onnx"
    }

    fn predict(&self, input: &Array3<f64>) -> Result<Array1<f64>, InferenceError> {
        let (channels, rows, bins) = input.dim();
        if rows * bins != self.input_len {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("[C, H, F] with H*F = {}", self.input_len),
                actual: format!("{:?}", input.dim()),
            });
        }

        let mut out = Array1::<f64>::zeros(channels);
        for (c, channel) in input.axis_iter(Axis(0)).enumerate() {
            let features: Vec<f32> = channel.iter().map(|&v| v as f32).collect();
            out[c] = self.run_channel(&features)?;
        }
        debug!("ONNX model scored {} channels", channels);
        Ok(out)
    }
}
