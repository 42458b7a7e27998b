//! Feature Extraction Error Types

use sensor_data::DataError;
use thiserror::Error;

/// Errors during feature extraction
#[derive(Debug, Error)]
pub enum FeatureError {
    /// Rolling window of zero samples
    #[error("Invalid window size {0}: must be at least 1")]
    InvalidWindow(usize),

    /// LOWESS fraction outside (0, 1]
    #[error("Invalid smoothing fraction {0}: must be in (0, 1]")]
    InvalidFraction(f64),

    /// Outer/inner window sizes that cannot tile the signal
    #[error(
        "Invalid frequency window: signal length {signal_len}, outer {outer}, inner {inner} \
         (need 2 <= inner <= outer <= signal length)"
    )]
    InvalidFrequencyWindow {
        signal_len: usize,
        outer: usize,
        inner: usize,
    },

    /// Channels of unequal length or no channels at all
    #[error("Invalid channel set: {0}")]
    InvalidChannels(String),

    /// Table access failed
    #[error(transparent)]
    Data(#[from] DataError),
}
