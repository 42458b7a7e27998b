//! Replay Monitor
//!
//! Steps through a pre-loaded feature table one row per tick, keeps the
//! most recent outer window of every model channel, and scores it once the
//! window is full.

use alerting::{HealthBand, HealthMonitor, HealthStatus};
use feature_engine::{FeatureError, FeatureExtractor};
use inference_engine::{InferenceEngine, RulPrediction};
use sensor_data::SensorTable;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

use crate::DashboardError;

/// Columns and limits of a replay
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Model input channels
    pub channels: Vec<String>,
    /// Live readout columns
    pub readout_columns: Vec<String>,
    /// Sensor plot column
    pub plot_column: String,
    /// Resets channel windows when the unit id changes
    pub unit_column: Option<String>,
    /// Restrict the replay to one unit
    pub replay_unit: Option<i64>,
    pub history_len: usize,
}

/// One point of the sensor plot
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SensorPoint {
    pub step: usize,
    pub value: f64,
}

/// One point of the health plot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulPoint {
    pub step: usize,
    pub rul: f64,
    pub band: HealthBand,
    pub latency_ms: u64,
}

/// Latest row shown in the readout panel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorReading {
    pub step: usize,
    pub unit: Option<i64>,
    pub values: Vec<Readout>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Readout {
    pub column: String,
    pub value: f64,
}

/// What a single tick did
#[derive(Debug, Clone)]
pub enum TickOutcome {
    /// Monitoring is stopped
    Idle,
    /// A row was consumed; `prediction` is set once the window is full
    Advanced {
        step: usize,
        prediction: Option<RulPrediction>,
    },
    /// The end of the table was reached and monitoring stopped
    Finished,
}

/// Replays a sensor table through the inference engine
pub struct Monitor {
    table: SensorTable,
    settings: MonitorSettings,
    /// Row order of the replay
    rows: Vec<usize>,
    cursor: usize,
    running: bool,
    current_unit: Option<i64>,
    windows: Vec<VecDeque<f64>>,
    extractor: FeatureExtractor,
    engine: InferenceEngine,
    health: HealthMonitor,
    sensor_history: VecDeque<SensorPoint>,
    rul_history: VecDeque<RulPoint>,
    latest: Option<SensorReading>,
    predictions: usize,
    last_latency_ms: Option<u64>,
}

impl Monitor {
    pub fn new(
        table: SensorTable,
        settings: MonitorSettings,
        extractor: FeatureExtractor,
        engine: InferenceEngine,
        health: HealthMonitor,
    ) -> Result<Self, DashboardError> {
        if settings.channels.is_empty() {
            return Err(DashboardError::Config("no model channels configured".to_string()));
        }
        if settings.history_len == 0 {
            return Err(DashboardError::Config("history_len must be positive".to_string()));
        }
        for column in settings
            .channels
            .iter()
            .chain(&settings.readout_columns)
            .chain(std::iter::once(&settings.plot_column))
        {
            table.column(column)?;
        }

        let unit_column = settings.unit_column.as_deref().filter(|c| table.has_column(c));
        let rows = match (settings.replay_unit, unit_column) {
            (Some(unit), Some(column)) => table
                .unit_groups(column)?
                .into_iter()
                .find(|(id, _)| *id == unit)
                .map(|(_, rows)| rows)
                .ok_or_else(|| DashboardError::Config(format!("unit {} not found in {}", unit, column)))?,
            (Some(_), None) => {
                return Err(DashboardError::Config(
                    "replay_unit set but the table has no unit column".to_string(),
                ))
            }
            (None, _) => (0..table.n_rows()).collect(),
        };

        info!(
            "Monitor ready: {} rows, {} channels, window {}",
            rows.len(),
            settings.channels.len(),
            extractor.required_samples()
        );

        let windows = vec![VecDeque::with_capacity(extractor.required_samples()); settings.channels.len()];
        Ok(Self {
            table,
            settings,
            rows,
            cursor: 0,
            running: false,
            current_unit: None,
            windows,
            extractor,
            engine,
            health,
            sensor_history: VecDeque::new(),
            rul_history: VecDeque::new(),
            latest: None,
            predictions: 0,
            last_latency_ms: None,
        })
    }

    /// Start (or restart after the end) the replay; returns true if the state changed
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        if self.is_finished() {
            self.rewind();
        }
        self.running = true;
        info!("Monitoring started at row {}", self.cursor);
        true
    }

    /// Pause the replay; returns true if the state changed
    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        info!("Monitoring stopped at row {}", self.cursor);
        true
    }

    fn rewind(&mut self) {
        self.cursor = 0;
        self.current_unit = None;
        self.windows.iter_mut().for_each(VecDeque::clear);
        self.sensor_history.clear();
        self.rul_history.clear();
        self.latest = None;
        self.health.reset();
    }

    /// Consume the next row when running
    pub fn tick(&mut self) -> Result<TickOutcome, DashboardError> {
        if !self.running {
            return Ok(TickOutcome::Idle);
        }
        let Some(&row) = self.rows.get(self.cursor) else {
            self.running = false;
            info!("Replay finished after {} rows", self.rows.len());
            return Ok(TickOutcome::Finished);
        };
        let step = self.cursor;
        metrics::counter!("rul_monitor_ticks_total").increment(1);

        let unit = match &self.settings.unit_column {
            Some(column) if self.table.has_column(column) => {
                let value = self.table.column(column)?[row];
                value.is_finite().then_some(value as i64)
            }
            _ => None,
        };

        // Nothing is committed until the row has been scored, so a failed
        // tick can be retried on the same row.
        let capacity = self.extractor.required_samples();
        let mut windows = if unit == self.current_unit {
            self.windows.clone()
        } else {
            vec![VecDeque::with_capacity(capacity); self.windows.len()]
        };
        for (window, column) in windows.iter_mut().zip(&self.settings.channels) {
            if window.len() == capacity {
                window.pop_front();
            }
            window.push_back(self.table.column(column)?[row]);
        }

        let values = self
            .settings
            .readout_columns
            .iter()
            .map(|column| {
                Ok(Readout {
                    column: column.clone(),
                    value: self.table.column(column)?[row],
                })
            })
            .collect::<Result<Vec<_>, DashboardError>>()?;
        let plotted = self.table.column(&self.settings.plot_column)?[row];

        let prediction = if windows.iter().all(|w| w.len() == capacity) {
            self.score(step, &windows)?
        } else {
            None
        };

        if unit != self.current_unit && self.current_unit.is_some() {
            debug!("Unit changed to {:?}, channel windows reset", unit);
        }
        self.current_unit = unit;
        self.windows = windows;
        self.latest = Some(SensorReading { step, unit, values });
        push_bounded(
            &mut self.sensor_history,
            SensorPoint { step, value: plotted },
            self.settings.history_len,
        );

        self.cursor += 1;
        if self.cursor == self.rows.len() {
            self.running = false;
            info!("Replay finished after {} rows", self.rows.len());
        }
        Ok(TickOutcome::Advanced { step, prediction })
    }

    fn score(&mut self, step: usize, windows: &[VecDeque<f64>]) -> Result<Option<RulPrediction>, DashboardError> {
        let samples: Vec<Vec<f64>> = windows.iter().map(|w| w.iter().copied().collect()).collect();
        let channels: Vec<&[f64]> = samples.iter().map(Vec::as_slice).collect();

        let input = match self.extractor.extract(&channels) {
            Ok(input) => input,
            Err(FeatureError::InvalidChannels(reason)) => {
                warn!("Skipping prediction at step {}: {}", step, reason);
                self.health.observe(f64::NAN);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let result = self.engine.predict(&input)?;
        let rul = result.prediction.rul;
        let band = self.health.observe(rul);

        self.predictions += 1;
        self.last_latency_ms = Some(result.latency_ms);
        metrics::counter!("rul_predictions_total").increment(1);
        metrics::histogram!("rul_inference_latency_ms").record(result.latency_ms as f64);
        if rul.is_finite() {
            metrics::gauge!("rul_predicted_cycles").set(rul);
        }

        push_bounded(
            &mut self.rul_history,
            RulPoint {
                step,
                rul,
                band,
                latency_ms: result.latency_ms,
            },
            self.settings.history_len,
        );
        debug!("Step {}: rul={:.1} band={}", step, rul, band.as_str());
        Ok(Some(result.prediction))
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.rows.len()
    }

    /// Rows consumed so far
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn prediction_count(&self) -> usize {
        self.predictions
    }

    pub fn last_latency_ms(&self) -> Option<u64> {
        self.last_latency_ms
    }

    pub fn model_name(&self) -> &str {
        self.engine.model_name()
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    pub fn latest(&self) -> Option<&SensorReading> {
        self.latest.as_ref()
    }

    pub fn health(&self) -> HealthStatus {
        self.health.status()
    }

    /// Most recent `limit` sensor plot points, oldest first
    pub fn sensor_history(&self, limit: usize) -> Vec<SensorPoint> {
        tail(&self.sensor_history, limit)
    }

    /// Most recent `limit` health plot points, oldest first
    pub fn rul_history(&self, limit: usize) -> Vec<RulPoint> {
        tail(&self.rul_history, limit)
    }
}

fn push_bounded<T>(buffer: &mut VecDeque<T>, item: T, capacity: usize) {
    if buffer.len() == capacity {
        buffer.pop_front();
    }
    buffer.push_back(item);
}

fn tail<T: Clone>(buffer: &VecDeque<T>, limit: usize) -> Vec<T> {
    buffer.iter().skip(buffer.len().saturating_sub(limit)).cloned().collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alerting::HealthConfig;
    use feature_engine::FrequencyConfig;
    use inference_engine::{InferenceError, RulModel};
    use ndarray::{Array1, Array3};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Model that returns the mean magnitude of each channel
    pub(crate) struct MeanModel;

    impl RulModel for MeanModel {
        fn name(&self) -> &str {
            "mean"
        }

        fn predict(&self, input: &Array3<f64>) -> Result<Array1<f64>, InferenceError> {
            let (c, h, f) = input.dim();
            Ok(Array1::from_shape_fn(c, |i| {
                input.index_axis(ndarray::Axis(0), i).sum() / (h * f) as f64
            }))
        }
    }

    /// Fails its first call, then behaves like `MeanModel`
    struct FailsOnceModel {
        calls: AtomicUsize,
    }

    impl RulModel for FailsOnceModel {
        fn name(&self) -> &str {
            "fails-once"
        }

        fn predict(&self, input: &Array3<f64>) -> Result<Array1<f64>, InferenceError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(InferenceError::InferenceFailed("backend unavailable".to_string()));
            }
            MeanModel.predict(input)
        }
    }

    pub(crate) fn frequency() -> FrequencyConfig {
        FrequencyConfig {
            outer_window: 4,
            inner_window: 2,
        }
    }

    pub(crate) fn table() -> SensorTable {
        let mut rows = Vec::new();
        for unit in 1..=2 {
            for t in 0..6 {
                rows.push(vec![unit as f64, t as f64, 10.0 * unit as f64 + t as f64]);
            }
        }
        SensorTable::from_rows(vec!["number".into(), "time".into(), "sensor_7".into()], &rows).unwrap()
    }

    pub(crate) fn settings() -> MonitorSettings {
        MonitorSettings {
            channels: vec!["sensor_7".into()],
            readout_columns: vec!["sensor_7".into(), "time".into()],
            plot_column: "sensor_7".into(),
            unit_column: Some("number".into()),
            replay_unit: None,
            history_len: 5,
        }
    }

    pub(crate) fn monitor_with(settings: MonitorSettings) -> Monitor {
        let freq = frequency();
        Monitor::new(
            table(),
            settings,
            FeatureExtractor::new(freq),
            InferenceEngine::new(Box::new(MeanModel), &freq),
            HealthMonitor::new(HealthConfig::default()).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_idle_until_started() {
        let mut monitor = monitor_with(settings());
        assert!(matches!(monitor.tick().unwrap(), TickOutcome::Idle));
        assert_eq!(monitor.cursor(), 0);

        assert!(monitor.start());
        assert!(!monitor.start());
        assert!(matches!(monitor.tick().unwrap(), TickOutcome::Advanced { step: 0, prediction: None }));
        assert!(monitor.stop());
        assert!(matches!(monitor.tick().unwrap(), TickOutcome::Idle));
        assert_eq!(monitor.cursor(), 1);
    }

    #[test]
    fn test_predicts_once_window_full_and_resets_per_unit() {
        let mut monitor = monitor_with(settings());
        monitor.start();

        let mut predicted_steps = Vec::new();
        while let TickOutcome::Advanced { step, prediction } = monitor.tick().unwrap() {
            if prediction.is_some() {
                predicted_steps.push(step);
            }
        }

        // window of 4 fills at t=3 within each unit of 6 rows
        assert_eq!(predicted_steps, vec![3, 4, 5, 9, 10, 11]);
        assert!(!monitor.is_running());
        assert!(monitor.is_finished());
        assert_eq!(monitor.prediction_count(), 6);
        assert_eq!(monitor.rul_history(100).len(), 5);
        assert_eq!(monitor.sensor_history(100).len(), 5);
        assert_eq!(monitor.sensor_history(2).last().map(|p| p.step), Some(11));

        let latest = monitor.latest().unwrap();
        assert_eq!(latest.unit, Some(2));
        assert_eq!(latest.values[0].value, 25.0);
        assert_ne!(monitor.health().band, HealthBand::Unknown);
    }

    #[test]
    fn test_restart_after_finish_rewinds() {
        let mut monitor = monitor_with(MonitorSettings {
            replay_unit: Some(2),
            ..settings()
        });
        assert_eq!(monitor.total_rows(), 6);

        monitor.start();
        while monitor.is_running() {
            monitor.tick().unwrap();
        }
        assert!(matches!(monitor.tick().unwrap(), TickOutcome::Idle));

        assert!(monitor.start());
        assert_eq!(monitor.cursor(), 0);
        assert!(monitor.rul_history(10).is_empty());
        assert_eq!(monitor.health().band, HealthBand::Unknown);
    }

    #[test]
    fn test_unknown_columns_rejected() {
        let freq = frequency();
        let result = Monitor::new(
            table(),
            MonitorSettings {
                plot_column: "vibration".into(),
                ..settings()
            },
            FeatureExtractor::new(freq),
            InferenceEngine::new(Box::new(MeanModel), &freq),
            HealthMonitor::default(),
        );
        assert!(matches!(result, Err(DashboardError::Data(_))));

        let result = Monitor::new(
            table(),
            MonitorSettings {
                replay_unit: Some(9),
                ..settings()
            },
            FeatureExtractor::new(freq),
            InferenceEngine::new(Box::new(MeanModel), &freq),
            HealthMonitor::default(),
        );
        assert!(matches!(result, Err(DashboardError::Config(_))));
    }

    #[test]
    fn test_failed_tick_retries_same_row() {
        let freq = frequency();
        let model = FailsOnceModel {
            calls: AtomicUsize::new(0),
        };
        let mut monitor = Monitor::new(
            table(),
            settings(),
            FeatureExtractor::new(freq),
            InferenceEngine::new(Box::new(model), &freq),
            HealthMonitor::default(),
        )
        .unwrap();
        monitor.start();

        for _ in 0..3 {
            monitor.tick().unwrap();
        }
        // first full window at row 3 hits the failing call
        assert!(matches!(monitor.tick(), Err(DashboardError::Inference(_))));
        assert_eq!(monitor.cursor(), 3);
        assert_eq!(monitor.windows[0], [10.0, 11.0, 12.0]);
        assert_eq!(monitor.sensor_history(10).len(), 3);
        assert_eq!(monitor.latest().map(|r| r.step), Some(2));

        monitor.stop();
        monitor.start();
        let outcome = monitor.tick().unwrap();
        assert!(matches!(outcome, TickOutcome::Advanced { step: 3, prediction: Some(_) }));
        assert_eq!(monitor.windows[0], [10.0, 11.0, 12.0, 13.0]);
        let steps: Vec<usize> = monitor.sensor_history(10).iter().map(|p| p.step).collect();
        assert_eq!(steps, vec![0, 1, 2, 3]);
        assert_eq!(monitor.prediction_count(), 1);
    }
}
