//! Declarative Column Transforms

use crate::autocorr::rolling_autocorr;
use crate::error::FeatureError;
use crate::smoothing::{lowess_slope, smooth_lowess};
use crate::statistics::{rolling_rms, rolling_z_score};
use sensor_data::SensorTable;
use serde::{Deserialize, Serialize};

/// A single-series transform with its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transform {
    RollingRms { window: usize },
    RollingZScore { window: usize },
    Lowess { frac: f64 },
    LowessSlope { frac: f64 },
    RollingAutocorr { lag: usize, window: usize },
}

impl Transform {
    /// Run the transform on one series
    pub fn apply(&self, series: &[f64]) -> Result<Vec<f64>, FeatureError> {
        match *self {
            Transform::RollingRms { window } => rolling_rms(series, window),
            Transform::RollingZScore { window } => rolling_z_score(series, window),
            Transform::Lowess { frac } => smooth_lowess(series, frac),
            Transform::LowessSlope { frac } => lowess_slope(series, frac),
            Transform::RollingAutocorr { lag, window } => rolling_autocorr(series, lag, window),
        }
    }

    /// Suffix used when a step does not name one
    pub fn default_suffix(&self) -> String {
        match self {
            Transform::RollingRms { window } => format!("rms{}", window),
            Transform::RollingZScore { window } => format!("z{}", window),
            Transform::Lowess { .. } => "lowess".to_string(),
            Transform::LowessSlope { .. } => "lowess_slope".to_string(),
            Transform::RollingAutocorr { lag, window } => format!("acf{}_{}", lag, window),
        }
    }
}

/// One (transform, suffix) entry of a feature pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStep {
    #[serde(flatten)]
    pub transform: Transform,
    #[serde(default)]
    pub suffix: Option<String>,
}

impl FeatureStep {
    pub fn new(transform: Transform, suffix: impl Into<String>) -> Self {
        Self {
            transform,
            suffix: Some(suffix.into()),
        }
    }

    pub fn suffix(&self) -> String {
        self.suffix.clone().unwrap_or_else(|| self.transform.default_suffix())
    }
}

/// Name of a derived column
pub fn derived_name(column: &str, suffix: &str) -> String {
    format!("{}_{}", column, suffix)
}

/// Apply `f` to `column` and store the result as `{column}_{suffix}`.
///
/// Returns the new column name.
pub fn apply_and_name<F>(
    table: &mut SensorTable,
    column: &str,
    suffix: &str,
    f: F,
) -> Result<String, FeatureError>
where
    F: FnOnce(&[f64]) -> Result<Vec<f64>, FeatureError>,
{
    let derived = f(table.column(column)?)?;
    let name = derived_name(column, suffix);
    table.insert_column(name.clone(), derived)?;
    Ok(name)
}

/// Apply a configured step to `column`
pub fn apply_step(table: &mut SensorTable, column: &str, step: &FeatureStep) -> Result<String, FeatureError> {
    apply_and_name(table, column, &step.suffix(), |series| step.transform.apply(series))
}
