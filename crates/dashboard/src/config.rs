//! Application Configuration

use alerting::HealthConfig;
use feature_engine::FeaturePipelineConfig;
use inference_engine::ModelConfig;
use sensor_data::DataConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::DashboardError;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "RUL_CONFIG";

/// Used when `RUL_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "configs/default_config.yaml";

/// `dashboard` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Listen address of the HTTP panels
    pub bind_addr: String,
    /// Replay tick period
    pub poll_interval_ms: u64,
    /// Points kept per plot
    pub history_len: usize,
    /// Columns fed to the model; empty means every derived feature column
    pub channels: Vec<String>,
    /// Columns shown as live readouts; empty means the model channels
    pub readout_columns: Vec<String>,
    /// Column drawn in the sensor plot; defaults to the first readout
    pub plot_column: Option<String>,
    /// Replay only this unit
    pub replay_unit: Option<i64>,
    pub device_name: String,
    pub device_id: String,
    /// Where the derived feature table is written after featurization
    pub feature_output_path: Option<PathBuf>,
    /// Emit JSON log lines
    pub log_json: bool,
    /// Install the Prometheus recorder and serve `/metrics`
    pub metrics: bool,
    /// Begin replaying immediately
    pub autostart: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            poll_interval_ms: 1000,
            history_len: 200,
            channels: Vec::new(),
            readout_columns: Vec::new(),
            plot_column: None,
            replay_unit: None,
            device_name: "Turbofan Engine".to_string(),
            device_id: "FD001".to_string(),
            feature_output_path: None,
            log_json: false,
            metrics: true,
            autostart: false,
        }
    }
}

/// Full configuration document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub features: FeaturePipelineConfig,
    pub model: ModelConfig,
    pub health: HealthConfig,
    pub dashboard: DashboardConfig,
}

impl AppConfig {
    /// Load from a YAML file with `RUL_*` overrides
    pub fn load(path: &Path) -> Result<Self, DashboardError> {
        let config: AppConfig = sensor_data::load_config(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Path from `RUL_CONFIG`, else the default
    pub fn path_from_env() -> PathBuf {
        std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn validate(&self) -> Result<(), DashboardError> {
        if self.dashboard.poll_interval_ms == 0 {
            return Err(DashboardError::Config("poll_interval_ms must be positive".to_string()));
        }
        if self.dashboard.history_len == 0 {
            return Err(DashboardError::Config("history_len must be positive".to_string()));
        }
        self.health.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inference_engine::GateKind;
    use std::io::Write;

    #[test]
    fn test_partial_document_uses_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "data:\n  input_path: logs/train.txt\n  has_header: false\nmodel:\n  gate: excitation\ndashboard:\n  device_id: ESN-42\n  channels: [sensor_7_rolling_rms]"
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.data.input_path, PathBuf::from("logs/train.txt"));
        assert!(!config.data.has_header);
        assert_eq!(config.model.gate, GateKind::Excitation);
        assert_eq!(config.model.hidden_size, 32);
        assert_eq!(config.dashboard.device_id, "ESN-42");
        assert_eq!(config.dashboard.channels, vec!["sensor_7_rolling_rms".to_string()]);
        assert_eq!(config.dashboard.poll_interval_ms, 1000);
        assert_eq!(config.health.critical_rul, 30.0);
    }

    #[test]
    fn test_shipped_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../configs/default_config.yaml");
        let config = AppConfig::load(&path).unwrap();
        assert!(!config.data.has_header);
        assert_eq!(config.data.drop_column_indices.len(), 10);
        assert_eq!(config.features.steps.len(), 2);
        assert_eq!(config.features.frequency.outer_window, 30);
        assert_eq!(config.dashboard.replay_unit, Some(1));
        assert_eq!(config.health.warning_rul, 80.0);
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::load(Path::new("/nonexistent/config.yaml")).unwrap_err();
        assert!(matches!(err, DashboardError::Data(sensor_data::DataError::FileNotFound(_))));
    }

    #[test]
    fn test_rejects_zero_poll_interval() {
        let config = AppConfig {
            dashboard: DashboardConfig {
                poll_interval_ms: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(DashboardError::Config(_))));
    }
}
