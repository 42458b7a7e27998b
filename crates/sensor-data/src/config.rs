//! Data Section Configuration and Document Loading

use crate::error::DataError;
use config::{Config, Environment, File, FileFormat};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Prefix for environment overrides (`RUL_DATA__INPUT_PATH`, ...)
pub const ENV_PREFIX: &str = "RUL";

/// Field separator of the sensor log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delimiter {
    #[default]
    Comma,
    Tab,
    /// Runs of spaces/tabs, as in the C-MAPSS text dumps
    Whitespace,
}

impl Delimiter {
    /// Byte separator for the csv reader; `None` for whitespace runs
    pub fn as_byte(&self) -> Option<u8> {
        match self {
            Delimiter::Comma => Some(b','),
            Delimiter::Tab => Some(b'\t'),
            Delimiter::Whitespace => None,
        }
    }
}

/// `data` section of the pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Sensor log path
    pub input_path: PathBuf,
    /// Whether the first line holds column names
    pub has_header: bool,
    /// Field separator
    pub delimiter: Delimiter,
    /// Column-name manifest for headerless logs
    pub column_names_path: Option<PathBuf>,
    /// Write synthesized names back to `column_names_path`
    pub save_inferred_columns: bool,
    /// Raw column positions removed before names are assigned
    pub drop_column_indices: Vec<usize>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("data/train_FD001.txt"),
            has_header: true,
            delimiter: Delimiter::Comma,
            column_names_path: None,
            save_inferred_columns: false,
            drop_column_indices: Vec::new(),
        }
    }
}

/// Load a YAML configuration document with `RUL_*` environment overrides
pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T, DataError> {
    if !path.exists() {
        error!("Configuration file not found: {}", path.display());
        return Err(DataError::FileNotFound(path.to_path_buf()));
    }

    let settings = Config::builder()
        .add_source(File::from(path).format(FileFormat::Yaml))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    debug!("Loaded configuration from {}", path.display());
    Ok(settings.try_deserialize()?)
}
