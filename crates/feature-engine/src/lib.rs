//! Feature Engineering Engine
//!
//! Rolling statistics, LOWESS smoothing, autocorrelation and FFT-based
//! frequency matrices for turbofan sensor streams, plus the declarative
//! pipeline that turns a loaded sensor table into model-ready features.

mod apply;
mod autocorr;
mod error;
mod features;
mod fft;
mod smoothing;
mod statistics;

pub use apply::{apply_and_name, apply_step, derived_name, FeatureStep, Transform};
pub use autocorr::{autocorr_manual, autocorr_pearson, rolling_autocorr};
pub use error::FeatureError;
pub use features::{
    FeatureExtractor, FeaturePipeline, FeaturePipelineConfig, FeatureReport, FrequencyConfig,
};
pub use fft::{FrequencyMatrix, FrequencyTransform};
pub use smoothing::{gradient, lowess, lowess_slope, smooth_lowess, DEFAULT_ROBUST_ITERATIONS};
pub use statistics::{rolling_apply, rolling_mean, rolling_rms, rolling_std, rolling_z_score};
