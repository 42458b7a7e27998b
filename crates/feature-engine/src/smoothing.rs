//! LOWESS Smoothing
//!
//! Locally weighted linear regression (Cleveland, 1979): each point is
//! refit from its `frac * n` nearest neighbours with tricube distance
//! weights, then refit again with bisquare weights that discount outliers.

use crate::error::FeatureError;

/// Robustifying passes after the initial fit
pub const DEFAULT_ROBUST_ITERATIONS: usize = 3;

fn tricube(d: f64) -> f64 {
    if d >= 1.0 {
        0.0
    } else {
        let t = 1.0 - d * d * d;
        t * t * t
    }
}

fn bisquare(u: f64) -> f64 {
    if u.abs() >= 1.0 {
        0.0
    } else {
        let t = 1.0 - u * u;
        t * t
    }
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    }
}

/// Local weighted linear fit at `x[i]` over `x[left..left + k]`
fn fit_point(x: &[f64], y: &[f64], robust: &[f64], i: usize, left: usize, k: usize) -> f64 {
    let right = left + k - 1;
    let radius = (x[i] - x[left]).max(x[right] - x[i]);

    let mut weights = Vec::with_capacity(k);
    for j in left..=right {
        let w = if radius > 0.0 {
            tricube((x[j] - x[i]).abs() / radius)
        } else {
            1.0
        };
        weights.push(w * robust[j]);
    }

    let sum_w: f64 = weights.iter().sum();
    if sum_w <= 0.0 {
        return y[i];
    }

    let (mut x_mean, mut y_mean) = (0.0, 0.0);
    for (w, j) in weights.iter().zip(left..=right) {
        x_mean += w * x[j];
        y_mean += w * y[j];
    }
    x_mean /= sum_w;
    y_mean /= sum_w;

    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (w, j) in weights.iter().zip(left..=right) {
        let dx = x[j] - x_mean;
        sxy += w * dx * (y[j] - y_mean);
        sxx += w * dx * dx;
    }

    if sxx <= 1e-12 * sum_w {
        y_mean
    } else {
        y_mean + (sxy / sxx) * (x[i] - x_mean)
    }
}

/// LOWESS fit of `y` against ascending `x`
pub fn lowess(x: &[f64], y: &[f64], frac: f64, iterations: usize) -> Result<Vec<f64>, FeatureError> {
    if !(frac > 0.0 && frac <= 1.0) {
        return Err(FeatureError::InvalidFraction(frac));
    }
    let n = x.len().min(y.len());
    if n < 2 {
        return Ok(y[..n].to_vec());
    }

    let k = (((frac * n as f64) + 1e-10).floor() as usize).clamp(2, n);
    let mut robust = vec![1.0; n];
    let mut fitted = vec![0.0; n];
    // residuals at rounding level mean the fit is already exact
    let tolerance = 1e-12 * y[..n].iter().fold(1.0f64, |acc, v| acc.max(v.abs()));

    for pass in 0..=iterations {
        let mut left = 0;
        for i in 0..n {
            // slide the k-neighbourhood while the next point is closer than the leftmost
            while left + k < n && x[i] - x[left] > x[left + k] - x[i] {
                left += 1;
            }
            fitted[i] = fit_point(x, y, &robust, i, left, k);
        }

        if pass == iterations {
            break;
        }

        let residuals: Vec<f64> = (0..n).map(|i| y[i] - fitted[i]).collect();
        let mut abs: Vec<f64> = residuals.iter().map(|r| r.abs()).collect();
        let scale = median(&mut abs);
        if scale <= tolerance {
            break;
        }
        for (r, e) in robust.iter_mut().zip(&residuals) {
            *r = bisquare(e / (6.0 * scale));
        }
    }

    Ok(fitted)
}

/// Smooth a series against its sample index; NaN samples are skipped and stay NaN
pub fn smooth_lowess(series: &[f64], frac: f64) -> Result<Vec<f64>, FeatureError> {
    let (x, y): (Vec<f64>, Vec<f64>) = series
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .map(|(i, &v)| (i as f64, v))
        .unzip();

    let fitted = lowess(&x, &y, frac, DEFAULT_ROBUST_ITERATIONS)?;

    let mut out = vec![f64::NAN; series.len()];
    for (pos, value) in x.iter().zip(fitted) {
        out[*pos as usize] = value;
    }
    Ok(out)
}

/// Numerical derivative with unit spacing: central differences inside,
/// one-sided differences at both ends
pub fn gradient(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return vec![f64::NAN; n];
    }

    let mut out = Vec::with_capacity(n);
    out.push(values[1] - values[0]);
    for i in 1..n - 1 {
        out.push(0.5 * (values[i + 1] - values[i - 1]));
    }
    out.push(values[n - 1] - values[n - 2]);
    out
}

/// Slope of the LOWESS trend, used as a degradation-rate feature
pub fn lowess_slope(series: &[f64], frac: f64) -> Result<Vec<f64>, FeatureError> {
    Ok(gradient(&smooth_lowess(series, frac)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_trend_reproduced() {
        let series: Vec<f64> = (0..50).map(|i| 3.0 + 0.5 * i as f64).collect();
        let smoothed = smooth_lowess(&series, 0.2).unwrap();
        for (a, b) in series.iter().zip(&smoothed) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_outlier_suppressed() {
        let mut series: Vec<f64> = (0..60).map(|i| (i as f64 * 0.1).sin()).collect();
        series[30] += 25.0;
        let smoothed = smooth_lowess(&series, 0.3).unwrap();
        assert!((smoothed[30] - (3.0f64).sin()).abs() < 0.2);
    }

    #[test]
    fn test_nan_positions_preserved() {
        let series = vec![1.0, 2.0, f64::NAN, 4.0, 5.0, 6.0];
        let smoothed = smooth_lowess(&series, 0.8).unwrap();
        assert_eq!(smoothed.len(), series.len());
        assert!(smoothed[2].is_nan());
        assert!((smoothed[3] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_fraction() {
        assert!(matches!(smooth_lowess(&[1.0, 2.0], 0.0), Err(FeatureError::InvalidFraction(_))));
        assert!(smooth_lowess(&[1.0, 2.0], 1.5).is_err());
    }

    #[test]
    fn test_gradient_matches_numpy() {
        assert_eq!(gradient(&[1.0, 2.0, 4.0, 7.0, 11.0]), vec![1.0, 1.5, 2.5, 3.5, 4.0]);
        assert!(gradient(&[1.0])[0].is_nan());
    }

    #[test]
    fn test_slope_of_line() {
        let series: Vec<f64> = (0..30).map(|i| -2.0 * i as f64).collect();
        let slope = lowess_slope(&series, 0.5).unwrap();
        assert!(slope.iter().all(|s| (s + 2.0).abs() < 1e-9));
    }
}
