//! Regression Head

use crate::init::{relu, uniform1, uniform2};
use crate::InferenceError;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;

/// Fully connected layer `y = x·Wᵀ + b`
#[derive(Debug, Clone)]
pub struct Dense {
    /// `[out, in]`
    weight: Array2<f64>,
    bias: Array1<f64>,
}

impl Dense {
    pub fn new(weight: Array2<f64>, bias: Array1<f64>) -> Result<Self, InferenceError> {
        if weight.nrows() != bias.len() || weight.is_empty() {
            return Err(InferenceError::InvalidConfig(format!(
                "dense weight {:?} with bias {}",
                weight.dim(),
                bias.len()
            )));
        }
        Ok(Self { weight, bias })
    }

    fn seeded(rng: &mut StdRng, inputs: usize, outputs: usize) -> Self {
        Self {
            weight: uniform2(rng, (outputs, inputs), inputs),
            bias: uniform1(rng, outputs, inputs),
        }
    }

    pub fn inputs(&self) -> usize {
        self.weight.ncols()
    }

    pub fn outputs(&self) -> usize {
        self.weight.nrows()
    }

    /// Caller guarantees `x` has `inputs()` columns
    pub(crate) fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        x.dot(&self.weight.t()) + &self.bias
    }
}

/// Linear → ReLU → Dropout per hidden width, then a single linear output
#[derive(Debug, Clone)]
pub struct RegressionHead {
    hidden: Vec<Dense>,
    output: Dense,
    /// Training-time rate; inference is the identity
    dropout: f64,
}

impl RegressionHead {
    pub fn new(hidden: Vec<Dense>, output: Dense, dropout: f64) -> Result<Self, InferenceError> {
        if output.outputs() != 1 {
            return Err(InferenceError::InvalidConfig(format!(
                "head output must be 1, got {}",
                output.outputs()
            )));
        }
        let widths: Vec<usize> = hidden.iter().map(|d| d.outputs()).collect();
        let expected_inputs = widths.last().copied();
        for (layer, prev) in hidden.iter().skip(1).zip(&widths) {
            if layer.inputs() != *prev {
                return Err(InferenceError::InvalidConfig(format!(
                    "head layer expects {} inputs after width {}",
                    layer.inputs(),
                    prev
                )));
            }
        }
        if let Some(width) = expected_inputs {
            if output.inputs() != width {
                return Err(InferenceError::InvalidConfig(format!(
                    "head output expects {} inputs after width {}",
                    output.inputs(),
                    width
                )));
            }
        }
        if !(0.0..1.0).contains(&dropout) {
            return Err(InferenceError::InvalidConfig(format!("dropout {} outside [0, 1)", dropout)));
        }
        Ok(Self { hidden, output, dropout })
    }

    pub fn seeded(rng: &mut StdRng, inputs: usize, widths: &[usize], dropout: f64) -> Self {
        let mut hidden = Vec::with_capacity(widths.len());
        let mut prev = inputs;
        for &width in widths {
            hidden.push(Dense::seeded(rng, prev, width));
            prev = width;
        }
        Self {
            hidden,
            output: Dense::seeded(rng, prev, 1),
            dropout,
        }
    }

    pub fn inputs(&self) -> usize {
        self.hidden.first().unwrap_or(&self.output).inputs()
    }

    pub fn dropout(&self) -> f64 {
        self.dropout
    }

    /// `[C, hidden]` → one estimate per channel `[C]`
    pub fn forward(&self, embeddings: &Array2<f64>) -> Result<Array1<f64>, InferenceError> {
        if embeddings.ncols() != self.inputs() {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("[C, {}]", self.inputs()),
                actual: format!("{:?}", embeddings.dim()),
            });
        }

        let mut x = embeddings.to_owned();
        for layer in &self.hidden {
            x = layer.forward(&x).mapv_into(relu);
        }
        Ok(self.output.forward(&x).column(0).to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    #[test]
    fn test_known_weights() {
        let hidden = Dense::new(array![[1.0, -1.0], [0.5, 0.5]], array![0.0, -1.0]).unwrap();
        let output = Dense::new(array![[2.0, 1.0]], array![0.25]).unwrap();
        let head = RegressionHead::new(vec![hidden], output, 0.2).unwrap();

        let y = head.forward(&array![[3.0, 1.0], [0.0, 4.0]]).unwrap();
        // row 0: relu([2, 1]) -> 2*2 + 1 + 0.25
        // row 1: relu([-4, 1]) -> 0 + 1 + 0.25
        assert_eq!(y, array![5.25, 1.25]);
    }

    #[test]
    fn test_seeded_shapes_and_stateless() {
        let mut rng = StdRng::seed_from_u64(9);
        let head = RegressionHead::seeded(&mut rng, 4, &[8, 3], 0.2);
        let x = Array2::from_shape_fn((5, 4), |(i, j)| (i as f64 - j as f64) * 0.3);
        let a = head.forward(&x).unwrap();
        assert_eq!(a.len(), 5);
        assert_eq!(a, head.forward(&x).unwrap());
    }

    #[test]
    fn test_rejects_bad_shapes() {
        let mut rng = StdRng::seed_from_u64(9);
        let head = RegressionHead::seeded(&mut rng, 4, &[], 0.0);
        assert!(head.forward(&Array2::zeros((2, 3))).is_err());

        let output = Dense::new(Array2::zeros((2, 4)), Array1::zeros(2)).unwrap();
        assert!(RegressionHead::new(Vec::new(), output, 0.0).is_err());
    }
}
