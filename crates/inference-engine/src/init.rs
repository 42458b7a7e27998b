//! Seeded Parameter Initialization

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::Rng;

/// Uniform in `±1/√fan_in`, the default for linear, conv and LSTM layers
fn bound(fan_in: usize) -> f64 {
    1.0 / (fan_in.max(1) as f64).sqrt()
}

pub(crate) fn uniform2(rng: &mut StdRng, shape: (usize, usize), fan_in: usize) -> Array2<f64> {
    let b = bound(fan_in);
    Array2::from_shape_fn(shape, |_| rng.gen_range(-b..b))
}

pub(crate) fn uniform1(rng: &mut StdRng, len: usize, fan_in: usize) -> Array1<f64> {
    let b = bound(fan_in);
    Array1::from_shape_fn(len, |_| rng.gen_range(-b..b))
}

pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

pub(crate) fn relu(x: f64) -> f64 {
    x.max(0.0)
}
