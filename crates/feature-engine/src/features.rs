//! Feature Pipeline and Model Input Assembly

use crate::apply::{apply_and_name, FeatureStep, Transform};
use crate::error::FeatureError;
use crate::fft::FrequencyTransform;
use ndarray::{s, Array3};
use sensor_data::{
    add_rul_labels, drop_low_std_columns, fill_series, FillMethod, SensorTable, StandardScaler,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Outer/inner window sizes of the frequency matrix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrequencyConfig {
    /// Outer window N (samples per frequency matrix)
    pub outer_window: usize,
    /// Inner window T (samples per FFT row)
    pub inner_window: usize,
}

impl Default for FrequencyConfig {
    fn default() -> Self {
        Self {
            outer_window: 30,
            inner_window: 10,
        }
    }
}

impl FrequencyConfig {
    /// Rows per matrix (H = N - T + 1)
    pub fn rows(&self) -> usize {
        (self.outer_window + 1).saturating_sub(self.inner_window)
    }

    /// Bins per row (F = ⌊T/2⌋)
    pub fn bins(&self) -> usize {
        self.inner_window / 2
    }
}

/// Batch feature pipeline configuration (`features` section)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturePipelineConfig {
    /// Unit (engine) identifier column
    pub unit_column: String,
    /// Cycle index column
    pub time_column: String,
    /// Columns to derive features from; empty means every non-key column
    pub target_columns: Vec<String>,
    /// Ordered (transform, suffix) steps applied to each target column
    pub steps: Vec<FeatureStep>,
    /// Run transforms separately for every unit
    pub per_unit: bool,
    /// Drop columns whose sample std is below this before deriving features
    pub low_std_threshold: Option<f64>,
    /// Fill NaN warm-up values of derived columns
    pub fill: Option<FillMethod>,
    /// Remove the raw target columns after deriving features
    pub drop_raw: bool,
    /// Fit a standard scaler on the derived columns and apply it
    pub scale: bool,
    /// Name of the RUL label column; `None` skips labeling
    pub rul_column: Option<String>,
    /// Frequency matrix windows for model input
    pub frequency: FrequencyConfig,
}

impl Default for FeaturePipelineConfig {
    fn default() -> Self {
        Self {
            unit_column: "number".to_string(),
            time_column: "time".to_string(),
            target_columns: Vec::new(),
            steps: vec![FeatureStep::new(Transform::RollingRms { window: 10 }, "rolling_rms")],
            per_unit: true,
            low_std_threshold: None,
            fill: Some(FillMethod::Backward),
            drop_raw: false,
            scale: true,
            rul_column: Some("RUL".to_string()),
            frequency: FrequencyConfig::default(),
        }
    }
}

/// Outcome of a pipeline run
#[derive(Debug, Clone, Default)]
pub struct FeatureReport {
    /// Columns added by the steps, in creation order
    pub derived_columns: Vec<String>,
    /// Columns removed for low variance
    pub dropped_columns: Vec<String>,
    /// Scaler fitted on the derived columns (unfitted when scaling is off)
    pub scaler: StandardScaler,
}

/// Batch featurization of a loaded sensor table
pub struct FeaturePipeline {
    config: FeaturePipelineConfig,
}

impl FeaturePipeline {
    pub fn new(config: FeaturePipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeaturePipelineConfig {
        &self.config
    }

    fn is_key(&self, name: &str) -> bool {
        name == self.config.unit_column
            || name == self.config.time_column
            || self.config.rul_column.as_deref() == Some(name)
    }

    /// Columns the steps run on
    pub fn target_columns(&self, table: &SensorTable) -> Vec<String> {
        if self.config.target_columns.is_empty() {
            table
                .column_names()
                .iter()
                .filter(|name| !self.is_key(name))
                .cloned()
                .collect()
        } else {
            self.config
                .target_columns
                .iter()
                .filter(|name| table.has_column(name))
                .cloned()
                .collect()
        }
    }

    /// Row groups transforms run over: one per unit, or the whole table
    fn groups(&self, table: &SensorTable) -> Result<Vec<Vec<usize>>, FeatureError> {
        if self.config.per_unit && table.has_column(&self.config.unit_column) {
            Ok(table
                .unit_groups(&self.config.unit_column)?
                .into_iter()
                .map(|(_, rows)| rows)
                .collect())
        } else {
            Ok(vec![(0..table.n_rows()).collect()])
        }
    }

    /// Derive, clean, scale and label features in place
    pub fn run(&self, table: &mut SensorTable) -> Result<FeatureReport, FeatureError> {
        let mut report = FeatureReport::default();

        if let Some(threshold) = self.config.low_std_threshold {
            let keep: Vec<String> = table
                .column_names()
                .iter()
                .filter(|name| self.is_key(name))
                .cloned()
                .collect();
            report.dropped_columns = drop_low_std_columns(table, threshold, &keep);
        }

        let targets = self.target_columns(table);
        let groups = self.groups(table)?;
        info!(
            "Running {} feature steps over {} columns and {} groups",
            self.config.steps.len(),
            targets.len(),
            groups.len()
        );

        for step in &self.config.steps {
            let suffix = step.suffix();
            for column in &targets {
                let name = apply_and_name(table, column, &suffix, |series| {
                    let mut out = vec![f64::NAN; series.len()];
                    for rows in &groups {
                        let part: Vec<f64> = rows.iter().map(|&r| series[r]).collect();
                        let derived = step.transform.apply(&part)?;
                        for (&r, v) in rows.iter().zip(derived) {
                            out[r] = v;
                        }
                    }
                    Ok(out)
                })?;
                debug!("Derived column {}", name);
                report.derived_columns.push(name);
            }
        }

        if let Some(method) = self.config.fill {
            for name in &report.derived_columns {
                let column = table.column_mut(name)?;
                for rows in &groups {
                    let mut part: Vec<f64> = rows.iter().map(|&r| column[r]).collect();
                    fill_series(&mut part, method);
                    for (&r, v) in rows.iter().zip(part) {
                        column[r] = v;
                    }
                }
            }
        }

        if self.config.drop_raw {
            table.drop_columns(&targets);
        }

        if self.config.scale && !report.derived_columns.is_empty() {
            report.scaler = StandardScaler::fit_transform(table, &report.derived_columns)?;
        }

        if let Some(rul) = &self.config.rul_column {
            if table.has_column(&self.config.unit_column) && table.has_column(&self.config.time_column) {
                add_rul_labels(table, &self.config.unit_column, &self.config.time_column, rul)?;
            }
        }

        info!("Feature table ready. Shape: {:?}", table.shape());
        Ok(report)
    }
}

/// Builds `[C, H, F]` frequency-magnitude input from the latest samples
pub struct FeatureExtractor {
    transform: FrequencyTransform,
    config: FrequencyConfig,
}

impl FeatureExtractor {
    pub fn new(config: FrequencyConfig) -> Self {
        Self {
            transform: FrequencyTransform::new(),
            config,
        }
    }

    pub fn config(&self) -> &FrequencyConfig {
        &self.config
    }

    /// Samples needed per channel before a matrix can be built
    pub fn required_samples(&self) -> usize {
        self.config.outer_window
    }

    /// Frequency magnitudes of the most recent outer window of every channel
    pub fn extract(&mut self, channels: &[&[f64]]) -> Result<Array3<f64>, FeatureError> {
        if channels.is_empty() {
            return Err(FeatureError::InvalidChannels("no channels".to_string()));
        }

        let outer = self.config.outer_window;
        let inner = self.config.inner_window;
        let shortest = channels.iter().map(|c| c.len()).min().unwrap_or(0);
        FrequencyTransform::check_windows(shortest, outer, inner)?;

        let mut out = Array3::<f64>::zeros((channels.len(), self.config.rows(), self.config.bins()));
        for (c, channel) in channels.iter().enumerate() {
            let recent = &channel[channel.len() - outer..];
            if recent.iter().any(|v| v.is_nan()) {
                return Err(FeatureError::InvalidChannels(format!("channel {} has NaN samples", c)));
            }
            let matrix = self.transform.freq_matrix(recent, outer, inner)?;
            out.slice_mut(s![c, .., ..]).assign(&matrix.magnitudes().slice(s![0, .., ..]));
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_log() -> SensorTable {
        let mut rows = Vec::new();
        for unit in 1..=2 {
            for t in 1..=25 {
                let wear = t as f64 * unit as f64;
                rows.push(vec![unit as f64, t as f64, 5.0, 640.0 + wear + (t as f64).sin()]);
            }
        }
        SensorTable::from_rows(
            vec!["number".into(), "time".into(), "flat".into(), "sensor_7".into()],
            &rows,
        )
        .unwrap()
    }

    #[test]
    fn test_pipeline_derives_scales_and_labels() {
        let config = FeaturePipelineConfig {
            target_columns: vec!["sensor_7".into()],
            ..Default::default()
        };
        let mut table = engine_log();
        let report = FeaturePipeline::new(config).run(&mut table).unwrap();

        assert_eq!(report.derived_columns, vec!["sensor_7_rolling_rms".to_string()]);
        let rms = table.column("sensor_7_rolling_rms").unwrap();
        // back-filled warm-up and standardized
        assert!(rms.iter().all(|v| v.is_finite()));
        let mean = rms.iter().sum::<f64>() / rms.len() as f64;
        assert!(mean.abs() < 1e-9);
        assert!(report.scaler.is_fitted());

        let rul = table.column("RUL").unwrap();
        assert_eq!(rul[0], 24.0);
        assert_eq!(rul[49], 0.0);
    }

    #[test]
    fn test_per_unit_windows_do_not_bleed() {
        let config = FeaturePipelineConfig {
            target_columns: vec!["sensor_7".into()],
            fill: None,
            scale: false,
            ..Default::default()
        };
        let mut table = engine_log();
        FeaturePipeline::new(config).run(&mut table).unwrap();

        let rms = table.column("sensor_7_rolling_rms").unwrap();
        // first rows of unit 2 are warm-up again
        assert!(rms[25].is_nan());
        assert!(rms[33].is_nan());
        assert!(rms[34].is_finite());
    }

    #[test]
    fn test_low_std_drop_and_default_targets() {
        let config = FeaturePipelineConfig {
            low_std_threshold: Some(1e-6),
            drop_raw: true,
            ..Default::default()
        };
        let mut table = engine_log();
        let report = FeaturePipeline::new(config).run(&mut table).unwrap();

        assert_eq!(report.dropped_columns, vec!["flat".to_string()]);
        assert_eq!(
            table.column_names(),
            &["number", "time", "sensor_7_rolling_rms", "RUL"]
        );
    }

    #[test]
    fn test_extractor_stacks_channels() {
        let mut extractor = FeatureExtractor::new(FrequencyConfig {
            outer_window: 5,
            inner_window: 3,
        });
        let a: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let b = vec![1.0; 12];

        let input = extractor.extract(&[&a, &b]).unwrap();
        assert_eq!(input.dim(), (2, 3, 1));
        // last window of `a` is 5..10, first row 5+6+7
        assert!((input[[0, 0, 0]] - 18.0).abs() < 1e-12);
        assert!((input[[1, 2, 0]] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_extractor_needs_full_window() {
        let mut extractor = FeatureExtractor::new(FrequencyConfig::default());
        let short = vec![0.0; 10];
        assert!(matches!(
            extractor.extract(&[&short]),
            Err(FeatureError::InvalidFrequencyWindow { .. })
        ));
        assert!(extractor.extract(&[]).is_err());
    }
}
