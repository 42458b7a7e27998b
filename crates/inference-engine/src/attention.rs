//! Frequency Attention (convolution + channel recalibration)
//!
//! Every input channel's `[H, F]` frequency matrix is convolved along the
//! frequency axis with `C'` shared filters, pooled per filter over `(H, W)`,
//! and the filter maps are rescaled by a gate before `tanh`. Channels are
//! never mixed; the channel axis is a batch axis.

use crate::init::{relu, sigmoid, uniform1, uniform2};
use crate::InferenceError;
use ndarray::{s, Array1, Array2, Array3, Array4, Axis};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// How pooled filter descriptors become gate weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    /// Each filter map is scaled by its own spatial mean
    #[default]
    SelfMean,
    /// Pooled descriptor routed through a learned bottleneck
    /// `sigmoid(W2 · relu(W1 · p + b1) + b2)`
    Excitation,
}

/// Learned squeeze-excite bottleneck
#[derive(Debug, Clone)]
pub struct Excitation {
    w1: Array2<f64>,
    b1: Array1<f64>,
    w2: Array2<f64>,
    b2: Array1<f64>,
}

impl Excitation {
    /// `w1: [r, C']`, `w2: [C', r]`
    pub fn new(w1: Array2<f64>, b1: Array1<f64>, w2: Array2<f64>, b2: Array1<f64>) -> Result<Self, InferenceError> {
        let (r, filters) = w1.dim();
        if b1.len() != r || w2.dim() != (filters, r) || b2.len() != filters {
            return Err(InferenceError::InvalidConfig(format!(
                "excitation shapes w1 {:?}, b1 {}, w2 {:?}, b2 {}",
                w1.dim(),
                b1.len(),
                w2.dim(),
                b2.len()
            )));
        }
        Ok(Self { w1, b1, w2, b2 })
    }

    fn seeded(rng: &mut StdRng, filters: usize, reduction: usize) -> Self {
        let r = (filters / reduction.max(1)).max(1);
        Self {
            w1: uniform2(rng, (r, filters), filters),
            b1: uniform1(rng, r, filters),
            w2: uniform2(rng, (filters, r), r),
            b2: uniform1(rng, filters, r),
        }
    }

    /// `pooled: [C, C']` → gate `[C, C']`
    fn gate(&self, pooled: &Array2<f64>) -> Array2<f64> {
        let hidden = (pooled.dot(&self.w1.t()) + &self.b1).mapv_into(relu);
        (hidden.dot(&self.w2.t()) + &self.b2).mapv_into(sigmoid)
    }
}

/// Result of the attention block
#[derive(Debug, Clone)]
pub struct AttentionOutput {
    /// Recalibrated maps `[C, C', H, W]`
    pub activations: Array4<f64>,
    /// Per-filter spatial means of the convolved maps `[C, C']`
    pub pooled: Array2<f64>,
    /// Gate applied to each filter map `[C, C']`
    pub gate: Array2<f64>,
}

/// Convolutional frequency attention block
#[derive(Debug, Clone)]
pub struct FrequencyAttention {
    /// Filters `[C', K]`
    weight: Array2<f64>,
    /// Filter bias `[C']`
    bias: Array1<f64>,
    excitation: Option<Excitation>,
}

impl FrequencyAttention {
    pub fn new(weight: Array2<f64>, bias: Array1<f64>) -> Result<Self, InferenceError> {
        let (filters, kernel) = weight.dim();
        if filters == 0 || kernel == 0 || bias.len() != filters {
            return Err(InferenceError::InvalidConfig(format!(
                "conv weight {:?} with bias {}",
                weight.dim(),
                bias.len()
            )));
        }
        Ok(Self {
            weight,
            bias,
            excitation: None,
        })
    }

    /// Route pooled descriptors through a bottleneck instead of self-gating
    pub fn with_excitation(mut self, excitation: Excitation) -> Result<Self, InferenceError> {
        if excitation.b2.len() != self.filters() {
            return Err(InferenceError::InvalidConfig(format!(
                "excitation for {} filters on a {}-filter block",
                excitation.b2.len(),
                self.filters()
            )));
        }
        self.excitation = Some(excitation);
        Ok(self)
    }

    /// Random initialization for `filters` kernels of `kernel_size` taps
    pub fn seeded(rng: &mut StdRng, filters: usize, kernel_size: usize, gate: GateKind, reduction: usize) -> Self {
        let excitation = match gate {
            GateKind::SelfMean => None,
            GateKind::Excitation => Some(Excitation::seeded(rng, filters, reduction)),
        };
        Self {
            weight: uniform2(rng, (filters, kernel_size), kernel_size),
            bias: uniform1(rng, filters, kernel_size),
            excitation,
        }
    }

    /// Number of filters (C')
    pub fn filters(&self) -> usize {
        self.weight.nrows()
    }

    /// Kernel size (K)
    pub fn kernel_size(&self) -> usize {
        self.weight.ncols()
    }

    pub fn gate_kind(&self) -> GateKind {
        if self.excitation.is_some() {
            GateKind::Excitation
        } else {
            GateKind::SelfMean
        }
    }

    /// Convolved width for `bins` input bins (W = F - K + 1)
    pub fn output_width(&self, bins: usize) -> Option<usize> {
        (bins >= self.kernel_size()).then(|| bins - self.kernel_size() + 1)
    }

    /// Valid 1-D convolution along the frequency axis: `[C, H, F]` → `[C, C', H, W]`
    pub fn convolve(&self, x: &Array3<f64>) -> Result<Array4<f64>, InferenceError> {
        let (channels, rows, bins) = x.dim();
        let width = match self.output_width(bins) {
            Some(w) if rows > 0 && channels > 0 => w,
            _ => {
                return Err(InferenceError::InvalidInputShape {
                    expected: format!("[C>0, H>0, F>={}]", self.kernel_size()),
                    actual: format!("{:?}", x.dim()),
                })
            }
        };

        let mut out = Array4::<f64>::zeros((channels, self.filters(), rows, width));
        for tap in 0..self.kernel_size() {
            // [C, 1, H, W] * [1, C', 1, 1]
            let shifted = x.slice(s![.., .., tap..tap + width]).insert_axis(Axis(1));
            let taps = self
                .weight
                .column(tap)
                .insert_axis(Axis(0))
                .insert_axis(Axis(2))
                .insert_axis(Axis(3));
            out += &(&shifted * &taps);
        }

        let bias = self
            .bias
            .view()
            .insert_axis(Axis(0))
            .insert_axis(Axis(2))
            .insert_axis(Axis(3));
        out += &bias;
        Ok(out)
    }

    /// Global average pooling over `(H, W)`: `[C, C', H, W]` → `[C, C']`
    pub fn pool(conv: &Array4<f64>) -> Array2<f64> {
        let (_, _, rows, width) = conv.dim();
        let area = (rows * width).max(1) as f64;
        conv.sum_axis(Axis(3)).sum_axis(Axis(2)) / area
    }

    /// Convolve, pool, gate and squash
    pub fn forward(&self, x: &Array3<f64>) -> Result<AttentionOutput, InferenceError> {
        let conv = self.convolve(x)?;
        let pooled = Self::pool(&conv);
        let gate = match &self.excitation {
            Some(excitation) => excitation.gate(&pooled),
            None => pooled.clone(),
        };

        let scale = gate.view().insert_axis(Axis(2)).insert_axis(Axis(3));
        let activations = (&conv * &scale).mapv_into(f64::tanh);

        Ok(AttentionOutput {
            activations,
            pooled,
            gate,
        })
    }
}
