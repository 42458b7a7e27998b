//! Autocorrelation Features

use crate::error::FeatureError;
use crate::statistics::rolling_apply;

/// Autocorrelation at `lag` using the whole-series mean and variance.
///
/// `r_k = Σ (x_t - x̄)(x_{t+k} - x̄) / Σ (x_t - x̄)²`
///
/// Lag 0 is 1.0 for any non-constant series. NaN when `lag` is not smaller
/// than the series length or the series has zero variance.
pub fn autocorr_manual(series: &[f64], lag: usize) -> f64 {
    let n = series.len();
    if n == 0 || lag >= n {
        return f64::NAN;
    }

    let mean = series.iter().sum::<f64>() / n as f64;
    let numerator: f64 = series[..n - lag]
        .iter()
        .zip(&series[lag..])
        .map(|(a, b)| (a - mean) * (b - mean))
        .sum();
    let denominator: f64 = series.iter().map(|v| (v - mean) * (v - mean)).sum();

    if denominator != 0.0 {
        numerator / denominator
    } else {
        f64::NAN
    }
}

/// Pearson correlation between the series and its `lag`-shifted copy.
///
/// Each half is centered on its own mean and pairs with a NaN are skipped.
/// Serves as a cross-check for [`autocorr_manual`]; the two agree closely
/// on long stationary series.
pub fn autocorr_pearson(series: &[f64], lag: usize) -> f64 {
    let n = series.len();
    if lag >= n {
        return f64::NAN;
    }

    let pairs: Vec<(f64, f64)> = series[..n - lag]
        .iter()
        .zip(&series[lag..])
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .map(|(&a, &b)| (a, b))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }

    let m = pairs.len() as f64;
    let mean_a = pairs.iter().map(|p| p.0).sum::<f64>() / m;
    let mean_b = pairs.iter().map(|p| p.1).sum::<f64>() / m;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        cov += (a - mean_a) * (b - mean_b);
        var_a += (a - mean_a) * (a - mean_a);
        var_b += (b - mean_b) * (b - mean_b);
    }

    let denom = (var_a * var_b).sqrt();
    if denom > 0.0 {
        cov / denom
    } else {
        f64::NAN
    }
}

/// Manual autocorrelation evaluated inside a trailing window
pub fn rolling_autocorr(series: &[f64], lag: usize, window: usize) -> Result<Vec<f64>, FeatureError> {
    rolling_apply(series, window, |slice| autocorr_manual(slice, lag))
}
