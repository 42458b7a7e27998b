//! Alerting System
//!
//! Maps predicted remaining useful life to health bands and tracks
//! degradation over time.

mod monitor;

pub use monitor::{HealthBand, HealthConfig, HealthMonitor, HealthStatus};

use thiserror::Error;

/// Errors in health configuration
#[derive(Debug, Error)]
pub enum HealthError {
    #[error("Invalid health thresholds: warning {warning} must exceed critical {critical} >= 0")]
    InvalidThresholds { warning: f64, critical: f64 },
}
