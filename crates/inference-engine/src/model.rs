//! RUL Network (attention → encoder → head)

use crate::attention::{FrequencyAttention, GateKind};
use crate::encoder::SequenceEncoder;
use crate::head::RegressionHead;
use crate::InferenceError;
use feature_engine::FrequencyConfig;
use ndarray::{Array1, Array3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Model section of the configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// ONNX artifact; when unset the native network is used
    pub model_path: Option<PathBuf>,
    /// Attention filters (C')
    pub conv_filters: usize,
    /// Attention kernel size (K)
    pub kernel_size: usize,
    pub gate: GateKind,
    /// Bottleneck reduction ratio for the excitation gate
    pub reduction: usize,
    pub hidden_size: usize,
    pub num_layers: usize,
    /// Hidden widths of the regression head
    pub head_hidden: Vec<usize>,
    pub dropout: f64,
    /// Seed for parameter initialization
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            conv_filters: 8,
            kernel_size: 3,
            gate: GateKind::SelfMean,
            reduction: 4,
            hidden_size: 32,
            num_layers: 1,
            head_hidden: vec![64, 32],
            dropout: 0.2,
            seed: 42,
        }
    }
}

/// Anything that maps a `[C, H, F]` frequency input to per-channel RUL
pub trait RulModel: Send + Sync {
    fn name(&self) -> &str;

    /// One estimate per channel
    fn predict(&self, input: &Array3<f64>) -> Result<Array1<f64>, InferenceError>;
}

/// Native frequency-attention LSTM regressor
#[derive(Debug, Clone)]
pub struct RulNetwork {
    attention: FrequencyAttention,
    encoder: SequenceEncoder,
    head: RegressionHead,
}

impl RulNetwork {
    /// Assemble from explicit layers, checking they chain for the given
    /// frequency windows
    pub fn from_parts(
        attention: FrequencyAttention,
        encoder: SequenceEncoder,
        head: RegressionHead,
        frequency: &FrequencyConfig,
    ) -> Result<Self, InferenceError> {
        let bins = frequency.bins();
        let width = attention
            .output_width(bins)
            .filter(|_| frequency.rows() > 0)
            .ok_or_else(|| InferenceError::InvalidInputShape {
                expected: format!("F>={} and H>0", attention.kernel_size()),
                actual: format!("F={} H={}", bins, frequency.rows()),
            })?;
        if encoder.input_size() != attention.filters() * width {
            return Err(InferenceError::InvalidConfig(format!(
                "encoder input {} does not match {} filters x width {}",
                encoder.input_size(),
                attention.filters(),
                width
            )));
        }
        if head.inputs() != encoder.hidden_size() {
            return Err(InferenceError::InvalidConfig(format!(
                "head expects {} inputs, encoder yields {}",
                head.inputs(),
                encoder.hidden_size()
            )));
        }
        Ok(Self {
            attention,
            encoder,
            head,
        })
    }

    /// Seeded random network sized for the given frequency windows
    pub fn seeded(config: &ModelConfig, frequency: &FrequencyConfig) -> Result<Self, InferenceError> {
        if config.conv_filters == 0 || config.kernel_size == 0 || config.hidden_size == 0 || config.num_layers == 0 {
            return Err(InferenceError::InvalidConfig(
                "conv_filters, kernel_size, hidden_size and num_layers must be positive".to_string(),
            ));
        }
        let bins = frequency.bins();
        if bins < config.kernel_size || frequency.rows() == 0 {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("F>={} and H>0", config.kernel_size),
                actual: format!("F={} H={}", bins, frequency.rows()),
            });
        }
        if !(0.0..1.0).contains(&config.dropout) {
            return Err(InferenceError::InvalidConfig(format!("dropout {} outside [0, 1)", config.dropout)));
        }

        let width = bins - config.kernel_size + 1;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let attention =
            FrequencyAttention::seeded(&mut rng, config.conv_filters, config.kernel_size, config.gate, config.reduction);
        let encoder =
            SequenceEncoder::seeded(&mut rng, config.conv_filters * width, config.hidden_size, config.num_layers);
        let head = RegressionHead::seeded(&mut rng, config.hidden_size, &config.head_hidden, config.dropout);

        info!(
            "Initialized RUL network: filters={} kernel={} gate={:?} hidden={} layers={} seed={}",
            config.conv_filters, config.kernel_size, config.gate, config.hidden_size, config.num_layers, config.seed
        );
        Self::from_parts(attention, encoder, head, frequency)
    }

    pub fn attention(&self) -> &FrequencyAttention {
        &self.attention
    }

    pub fn encoder(&self) -> &SequenceEncoder {
        &self.encoder
    }

    pub fn head(&self) -> &RegressionHead {
        &self.head
    }
}

impl RulModel for RulNetwork {
    fn name(&self) -> &str {
        "frequency-attention-lstm"
    }

    fn predict(&self, input: &Array3<f64>) -> Result<Array1<f64>, InferenceError> {
        let attended = self.attention.forward(input)?;
        let embeddings = self.encoder.encode(&attended.activations)?;
        self.head.forward(&embeddings)
    }
}
