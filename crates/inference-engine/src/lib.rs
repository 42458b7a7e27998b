//! RUL Inference Engine
//!
//! Frequency-attention LSTM regressor over `[C, H, F]` frequency matrices,
//! with an ONNX adapter (tract-onnx) for exported model artifacts.

mod attention;
mod encoder;
mod engine;
mod head;
mod init;
mod model;
mod onnx;

pub use attention::{AttentionOutput, Excitation, FrequencyAttention, GateKind};
pub use encoder::{LstmLayer, SequenceEncoder};
pub use engine::{InferenceEngine, InferenceResult, RulPrediction};
pub use head::{Dense, RegressionHead};
pub use model::{ModelConfig, RulModel, RulNetwork};
pub use onnx::OnnxModel;

use thiserror::Error;

/// Errors during inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: String, actual: String },
    #[error("Invalid model configuration: {0}")]
    InvalidConfig(String),
}
