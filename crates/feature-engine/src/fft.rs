//! FFT-based Frequency Matrices
//!
//! A 1-D signal of length `L` is cut into `M = L - N + 1` outer windows of
//! `N` samples. Each outer window is cut again into `H = N - T + 1` inner
//! rows of `T` samples, and every row is replaced by the first
//! `F = ⌊T/2⌋` bins of its FFT. Bin 0 is DC; for even `T` the Nyquist bin
//! `T/2` is not included.

use crate::error::FeatureError;
use ndarray::{s, Array3, ArrayView2};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Stacked frequency matrices `[window, row, bin]`
#[derive(Debug, Clone)]
pub struct FrequencyMatrix {
    bins: Array3<Complex<f64>>,
}

impl FrequencyMatrix {
    /// Shape `[M, H, F]`
    pub fn shape(&self) -> (usize, usize, usize) {
        self.bins.dim()
    }

    /// Number of outer windows (M)
    pub fn windows(&self) -> usize {
        self.bins.dim().0
    }

    /// Rows per outer window (H)
    pub fn rows(&self) -> usize {
        self.bins.dim().1
    }

    /// Frequency bins per row (F)
    pub fn bins(&self) -> usize {
        self.bins.dim().2
    }

    /// Complex spectrum
    pub fn values(&self) -> &Array3<Complex<f64>> {
        &self.bins
    }

    /// One outer window `[H, F]`
    pub fn window(&self, m: usize) -> Option<ArrayView2<'_, Complex<f64>>> {
        (m < self.windows()).then(|| self.bins.slice(s![m, .., ..]))
    }

    /// Magnitude spectrum `[M, H, F]`
    pub fn magnitudes(&self) -> Array3<f64> {
        self.bins.mapv(|c| c.norm())
    }
}

/// Frequency transform with cached forward FFT plans per inner window
#[derive(Default)]
pub struct FrequencyTransform {
    plans: HashMap<usize, Arc<dyn Fft<f64>>>,
}

impl FrequencyTransform {
    pub fn new() -> Self {
        Self::default()
    }

    fn plan(&mut self, len: usize) -> Arc<dyn Fft<f64>> {
        self.plans
            .entry(len)
            .or_insert_with(|| FftPlanner::new().plan_fft_forward(len))
            .clone()
    }

    /// Validate `2 <= inner <= outer <= signal_len`
    pub fn check_windows(signal_len: usize, outer: usize, inner: usize) -> Result<(), FeatureError> {
        if inner < 2 || inner > outer || outer > signal_len {
            return Err(FeatureError::InvalidFrequencyWindow {
                signal_len,
                outer,
                inner,
            });
        }
        Ok(())
    }

    /// Build the `[M, H, F]` frequency matrix of `signal`
    pub fn freq_matrix(
        &mut self,
        signal: &[f64],
        outer: usize,
        inner: usize,
    ) -> Result<FrequencyMatrix, FeatureError> {
        Self::check_windows(signal.len(), outer, inner)?;

        let windows = signal.len() - outer + 1;
        let rows = outer - inner + 1;
        let bins = inner / 2;

        let fft = self.plan(inner);
        let mut out = Array3::<Complex<f64>>::zeros((windows, rows, bins));
        let mut buffer = vec![Complex::new(0.0, 0.0); inner];

        for m in 0..windows {
            for h in 0..rows {
                // row h of window m starts at sample m + h
                let start = m + h;
                for (slot, &v) in buffer.iter_mut().zip(&signal[start..start + inner]) {
                    *slot = Complex::new(v, 0.0);
                }
                fft.process(&mut buffer);
                for (f, value) in buffer.iter().take(bins).enumerate() {
                    out[[m, h, f]] = *value;
                }
            }
        }

        debug!(
            "Frequency matrix: L={} N={} T={} -> [{}, {}, {}]",
            signal.len(),
            outer,
            inner,
            windows,
            rows,
            bins
        );
        Ok(FrequencyMatrix { bins: out })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f64::consts::PI;

    #[test]
    fn test_shape_l10_n5_t3() {
        let signal: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let fm = FrequencyTransform::new().freq_matrix(&signal, 5, 3).unwrap();
        assert_eq!(fm.shape(), (6, 3, 1));
    }

    #[test]
    fn test_dc_bin_is_row_sum() {
        let signal: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let fm = FrequencyTransform::new().freq_matrix(&signal, 5, 3).unwrap();
        // window 2, row 1 covers samples 3, 4, 5
        let dc = fm.values()[[2, 1, 0]];
        assert!((dc.re - 12.0).abs() < 1e-12);
        assert!(dc.im.abs() < 1e-12);

        let window = fm.window(2).unwrap();
        assert_eq!(window.dim(), (3, 1));
        assert_eq!(window[[1, 0]], dc);
        assert!(fm.window(fm.windows()).is_none());
    }

    #[test]
    fn test_even_inner_excludes_nyquist() {
        let signal: Vec<f64> = (0..16).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let fm = FrequencyTransform::new().freq_matrix(&signal, 8, 4).unwrap();
        assert_eq!(fm.bins(), 2);
        // alternating signal lives entirely in the Nyquist bin, which is dropped
        assert!(fm.magnitudes().iter().all(|&m| m < 1e-9));
    }

    #[test]
    fn test_tone_peaks_in_its_bin() {
        let signal: Vec<f64> = (0..64).map(|i| (2.0 * PI * 2.0 * i as f64 / 16.0).cos()).collect();
        let fm = FrequencyTransform::new().freq_matrix(&signal, 32, 16).unwrap();
        let window = fm.magnitudes();
        let row: ndarray::ArrayView1<f64> = window.slice(s![0, 0, ..]);
        let peak = row
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(peak, Some(2));
        assert!((row[2] - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_windows_fail_fast() {
        let mut ft = FrequencyTransform::new();
        let signal = vec![0.0; 10];
        assert!(matches!(
            ft.freq_matrix(&signal, 5, 6),
            Err(FeatureError::InvalidFrequencyWindow { .. })
        ));
        assert!(ft.freq_matrix(&signal, 11, 3).is_err());
        assert!(ft.freq_matrix(&signal, 5, 1).is_err());
        assert!(ft.freq_matrix(&[], 1, 1).is_err());
    }

    proptest! {
        #[test]
        fn prop_shape_invariants(len in 2usize..80, outer_seed in 0usize..1000, inner_seed in 0usize..1000) {
            let outer = 2 + outer_seed % (len - 1);
            let inner = 2 + inner_seed % (outer - 1);
            let signal: Vec<f64> = (0..len).map(|i| (i as f64 * 0.3).sin()).collect();

            let fm = FrequencyTransform::new().freq_matrix(&signal, outer, inner).unwrap();
            prop_assert_eq!(fm.shape(), (len - outer + 1, outer - inner + 1, inner / 2));
        }
    }
}
