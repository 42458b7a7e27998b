//! LSTM Sequence Encoder
//!
//! Rows of the attention output are the time steps; the channel axis is the
//! batch. Only the last layer's final hidden state is kept.

use crate::init::{sigmoid, uniform1, uniform2};
use crate::InferenceError;
use ndarray::{s, Array1, Array2, Array3, Array4, Axis};
use rand::rngs::StdRng;

/// One LSTM layer with PyTorch gate order (input, forget, cell, output)
#[derive(Debug, Clone)]
pub struct LstmLayer {
    /// `[4·hidden, input]`
    w_ih: Array2<f64>,
    /// `[4·hidden, hidden]`
    w_hh: Array2<f64>,
    /// `b_ih + b_hh`, `[4·hidden]`
    bias: Array1<f64>,
}

impl LstmLayer {
    pub fn new(
        w_ih: Array2<f64>,
        w_hh: Array2<f64>,
        b_ih: Array1<f64>,
        b_hh: Array1<f64>,
    ) -> Result<Self, InferenceError> {
        let gates = w_ih.nrows();
        let hidden = gates / 4;
        if gates == 0 || gates % 4 != 0 || w_hh.dim() != (gates, hidden) || b_ih.len() != gates || b_hh.len() != gates
        {
            return Err(InferenceError::InvalidConfig(format!(
                "lstm shapes w_ih {:?}, w_hh {:?}, b_ih {}, b_hh {}",
                w_ih.dim(),
                w_hh.dim(),
                b_ih.len(),
                b_hh.len()
            )));
        }
        Ok(Self {
            w_ih,
            w_hh,
            bias: b_ih + b_hh,
        })
    }

    fn seeded(rng: &mut StdRng, input_size: usize, hidden_size: usize) -> Self {
        let gates = 4 * hidden_size;
        let b_ih = uniform1(rng, gates, hidden_size);
        let b_hh = uniform1(rng, gates, hidden_size);
        Self {
            w_ih: uniform2(rng, (gates, input_size), hidden_size),
            w_hh: uniform2(rng, (gates, hidden_size), hidden_size),
            bias: b_ih + b_hh,
        }
    }

    pub fn input_size(&self) -> usize {
        self.w_ih.ncols()
    }

    pub fn hidden_size(&self) -> usize {
        self.w_hh.ncols()
    }

    /// Run `[batch, steps, input]`, returning every hidden state `[batch, steps, hidden]`.
    ///
    /// The input width must equal `input_size()`; `SequenceEncoder::encode` checks it.
    pub(crate) fn forward(&self, x: &Array3<f64>) -> Array3<f64> {
        let (batch, steps, _) = x.dim();
        let hidden = self.hidden_size();
        let mut h = Array2::<f64>::zeros((batch, hidden));
        let mut c = Array2::<f64>::zeros((batch, hidden));
        let mut out = Array3::<f64>::zeros((batch, steps, hidden));

        for t in 0..steps {
            let gates = x.index_axis(Axis(1), t).dot(&self.w_ih.t()) + h.dot(&self.w_hh.t()) + &self.bias;

            let i = gates.slice(s![.., 0..hidden]).mapv(sigmoid);
            let f = gates.slice(s![.., hidden..2 * hidden]).mapv(sigmoid);
            let g = gates.slice(s![.., 2 * hidden..3 * hidden]).mapv(f64::tanh);
            let o = gates.slice(s![.., 3 * hidden..]).mapv(sigmoid);

            c = &f * &c + &i * &g;
            h = &o * &c.mapv(f64::tanh);
            out.index_axis_mut(Axis(1), t).assign(&h);
        }

        out
    }
}

/// Stacked LSTM over attention rows
#[derive(Debug, Clone)]
pub struct SequenceEncoder {
    layers: Vec<LstmLayer>,
}

impl SequenceEncoder {
    pub fn new(layers: Vec<LstmLayer>) -> Result<Self, InferenceError> {
        if layers.is_empty() {
            return Err(InferenceError::InvalidConfig("encoder needs at least one layer".to_string()));
        }
        for pair in layers.windows(2) {
            if pair[1].input_size() != pair[0].hidden_size() {
                return Err(InferenceError::InvalidConfig(format!(
                    "layer input {} does not match previous hidden {}",
                    pair[1].input_size(),
                    pair[0].hidden_size()
                )));
            }
        }
        Ok(Self { layers })
    }

    pub fn seeded(rng: &mut StdRng, input_size: usize, hidden_size: usize, num_layers: usize) -> Self {
        let layers = (0..num_layers.max(1))
            .map(|l| LstmLayer::seeded(rng, if l == 0 { input_size } else { hidden_size }, hidden_size))
            .collect();
        Self { layers }
    }

    /// Features per time step (C'·W)
    pub fn input_size(&self) -> usize {
        self.layers[0].input_size()
    }

    pub fn hidden_size(&self) -> usize {
        self.layers[self.layers.len() - 1].hidden_size()
    }

    /// `[C, C', H, W]` → `[C, H, C'·W]`
    pub fn to_sequence(activations: &Array4<f64>) -> Result<Array3<f64>, InferenceError> {
        let (channels, filters, rows, width) = activations.dim();
        activations
            .view()
            .permuted_axes([0, 2, 1, 3])
            .as_standard_layout()
            .into_owned()
            .into_shape_with_order((channels, rows, filters * width))
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))
    }

    /// Final hidden state of the last layer per channel, `[C, hidden]`
    pub fn encode(&self, activations: &Array4<f64>) -> Result<Array2<f64>, InferenceError> {
        let mut x = Self::to_sequence(activations)?;
        let (_, steps, features) = x.dim();
        if steps == 0 || features != self.input_size() {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("[C, H>0, {}]", self.input_size()),
                actual: format!("{:?}", x.dim()),
            });
        }

        for layer in &self.layers {
            x = layer.forward(&x);
        }
        Ok(x.index_axis(Axis(1), steps - 1).to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    #[test]
    fn test_single_step_matches_hand_computation() {
        // hidden 1, input 1, all weights 0.5, biases 0
        let layer = LstmLayer::new(
            Array2::from_elem((4, 1), 0.5),
            Array2::from_elem((4, 1), 0.5),
            Array1::zeros(4),
            Array1::zeros(4),
        )
        .unwrap();
        let x = Array3::from_elem((1, 1, 1), 2.0);
        let h = layer.forward(&x);

        let i = sigmoid(1.0);
        let g = 1.0f64.tanh();
        let c = i * g;
        let expected = sigmoid(1.0) * c.tanh();
        assert!((h[[0, 0, 0]] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_sequence_layout() {
        let act = Array4::from_shape_fn((2, 3, 4, 5), |(c, f, h, w)| (c * 1000 + f * 100 + h * 10 + w) as f64);
        let seq = SequenceEncoder::to_sequence(&act).unwrap();
        assert_eq!(seq.dim(), (2, 4, 15));
        // channel 1, row 2, filter 1, width 3
        assert_eq!(seq[[1, 2, 5 + 3]], 1123.0);
    }

    #[test]
    fn test_encode_shape_and_determinism() {
        let mut rng = StdRng::seed_from_u64(42);
        let encoder = SequenceEncoder::seeded(&mut rng, 6, 8, 2);
        let act = Array4::from_shape_fn((3, 2, 5, 3), |(c, f, h, w)| ((c + f + h + w) as f64 * 0.1).sin());

        let a = encoder.encode(&act).unwrap();
        let b = encoder.encode(&act).unwrap();
        assert_eq!(a.dim(), (3, 8));
        assert_eq!(a, b);
        assert!(a.iter().all(|v| v.abs() < 1.0));
    }

    #[test]
    fn test_rejects_mismatched_features() {
        let mut rng = StdRng::seed_from_u64(1);
        let encoder = SequenceEncoder::seeded(&mut rng, 4, 2, 1);
        let act = Array4::<f64>::zeros((1, 2, 3, 3));
        assert!(matches!(
            encoder.encode(&act),
            Err(InferenceError::InvalidInputShape { .. })
        ));
    }

    #[test]
    fn test_layer_chain_validated() {
        let l1 = LstmLayer::new(Array2::zeros((8, 3)), Array2::zeros((8, 2)), Array1::zeros(8), Array1::zeros(8)).unwrap();
        let l2 = LstmLayer::new(Array2::zeros((4, 5)), Array2::zeros((4, 1)), array![0.0, 0.0, 0.0, 0.0], Array1::zeros(4))
            .unwrap();
        assert!(SequenceEncoder::new(vec![l1, l2]).is_err());
        assert!(SequenceEncoder::new(Vec::new()).is_err());
    }
}
