//! Rolling Statistical Features
//!
//! All transforms return a series aligned to the input: positions before the
//! first full window, and windows touching a NaN, are NaN.

use crate::error::FeatureError;

fn check_window(window: usize) -> Result<(), FeatureError> {
    if window == 0 {
        return Err(FeatureError::InvalidWindow(window));
    }
    Ok(())
}

/// Apply `stat` to every full trailing window of `series`
pub fn rolling_apply<F>(series: &[f64], window: usize, mut stat: F) -> Result<Vec<f64>, FeatureError>
where
    F: FnMut(&[f64]) -> f64,
{
    check_window(window)?;

    let out = (0..series.len())
        .map(|i| {
            if i + 1 < window {
                return f64::NAN;
            }
            let slice = &series[i + 1 - window..=i];
            if slice.iter().any(|v| v.is_nan()) {
                f64::NAN
            } else {
                stat(slice)
            }
        })
        .collect();
    Ok(out)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (ddof = 1); NaN for fewer than two values.
///
/// Constant windows are exactly 0, and so is any spread below the rounding
/// noise of the mean.
fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    if values.iter().all(|v| *v == values[0]) {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    let std = (ss / (values.len() - 1) as f64).sqrt();
    if std <= f64::EPSILON * m.abs() {
        0.0
    } else {
        std
    }
}

/// Rolling mean over `window` samples
pub fn rolling_mean(series: &[f64], window: usize) -> Result<Vec<f64>, FeatureError> {
    rolling_apply(series, window, mean)
}

/// Rolling sample standard deviation over `window` samples
pub fn rolling_std(series: &[f64], window: usize) -> Result<Vec<f64>, FeatureError> {
    rolling_apply(series, window, sample_std)
}

/// Rolling root-mean-square: square, rolling mean, square root
pub fn rolling_rms(series: &[f64], window: usize) -> Result<Vec<f64>, FeatureError> {
    let squared: Vec<f64> = series.iter().map(|v| v * v).collect();
    Ok(rolling_mean(&squared, window)?.into_iter().map(f64::sqrt).collect())
}

/// Rolling z-score `(x - mean) / std` with both moments over the same window.
///
/// NaN where the rolling standard deviation is zero.
pub fn rolling_z_score(series: &[f64], window: usize) -> Result<Vec<f64>, FeatureError> {
    let means = rolling_mean(series, window)?;
    let stds = rolling_std(series, window)?;

    Ok(series
        .iter()
        .zip(means.iter().zip(&stds))
        .map(|(&x, (&m, &s))| if s > 0.0 { (x - m) / s } else { f64::NAN })
        .collect())
}
