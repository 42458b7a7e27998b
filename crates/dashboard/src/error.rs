//! Dashboard Error Types

use alerting::HealthError;
use feature_engine::FeatureError;
use inference_engine::InferenceError;
use sensor_data::DataError;
use thiserror::Error;

/// Errors while bootstrapping or running the dashboard
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Feature error: {0}")]
    Feature(#[from] FeatureError),

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error("Health configuration error: {0}")]
    Health(#[from] HealthError),

    #[error("Invalid dashboard configuration: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}
