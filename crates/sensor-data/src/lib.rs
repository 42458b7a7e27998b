//! Sensor Data Loading and Preparation
//!
//! Loads delimited turbofan sensor logs into labeled tables, manages
//! column-name manifests, and provides cleaning, scaling and RUL labeling.

mod cleaner;
mod config;
mod error;
mod labels;
mod loader;
mod manifest;
mod scaler;
mod table;

pub use cleaner::{drop_low_std_columns, fill_missing, fill_series, nan_std, FillMethod};
pub use config::{load_config, DataConfig, Delimiter, ENV_PREFIX};
pub use error::DataError;
pub use labels::add_rul_labels;
pub use loader::load_table;
pub use manifest::{load_column_names, save_column_names, ColumnManifest};
pub use scaler::{ColumnScale, StandardScaler};
pub use table::SensorTable;
