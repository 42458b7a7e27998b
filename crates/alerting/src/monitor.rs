//! Health Monitor Implementation

use crate::HealthError;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Health band thresholds in remaining cycles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// RUL at or below this is a warning (default: 80)
    pub warning_rul: f64,
    /// RUL at or below this is critical (default: 30)
    pub critical_rul: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            warning_rul: 80.0,
            critical_rul: 30.0,
        }
    }
}

impl HealthConfig {
    pub fn validate(&self) -> Result<(), HealthError> {
        let finite = self.critical_rul.is_finite() && self.warning_rul.is_finite();
        if !finite || self.critical_rul < 0.0 || self.critical_rul >= self.warning_rul {
            return Err(HealthError::InvalidThresholds {
                warning: self.warning_rul,
                critical: self.critical_rul,
            });
        }
        Ok(())
    }

    /// Classify a RUL estimate
    pub fn classify(&self, rul: f64) -> HealthBand {
        if !rul.is_finite() {
            HealthBand::Unknown
        } else if rul <= self.critical_rul {
            HealthBand::Critical
        } else if rul <= self.warning_rul {
            HealthBand::Warning
        } else {
            HealthBand::Healthy
        }
    }
}

/// Engine health status derived from predicted RUL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthBand {
    Healthy,
    Warning,
    Critical,
    /// No usable estimate yet
    Unknown,
}

impl HealthBand {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthBand::Healthy => "healthy",
            HealthBand::Warning => "warning",
            HealthBand::Critical => "critical",
            HealthBand::Unknown => "unknown",
        }
    }

    /// Operator-facing status message
    pub fn message(&self) -> &'static str {
        match self {
            HealthBand::Healthy => "Engine operating normally",
            HealthBand::Warning => "Degradation detected, schedule maintenance",
            HealthBand::Critical => "Failure imminent, ground engine for maintenance",
            HealthBand::Unknown => "Waiting for enough sensor history",
        }
    }

    fn severity(&self) -> u8 {
        match self {
            HealthBand::Unknown => 0,
            HealthBand::Healthy => 1,
            HealthBand::Warning => 2,
            HealthBand::Critical => 3,
        }
    }

    /// True when moving from `self` to `next` is a degradation
    pub fn degrades_to(&self, next: HealthBand) -> bool {
        next.severity() > self.severity() && next.severity() > 1
    }
}

/// Snapshot of the current health state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub band: HealthBand,
    pub label: String,
    pub message: String,
    /// Last observed RUL (NaN before the first estimate)
    pub rul: f64,
    /// Number of band changes seen
    pub transitions: usize,
    /// Seconds since the band last changed
    pub seconds_in_band: u64,
}

/// Tracks band transitions over a stream of RUL estimates
pub struct HealthMonitor {
    config: HealthConfig,
    band: HealthBand,
    last_rul: f64,
    transitions: usize,
    last_change: Instant,
}

impl HealthMonitor {
    /// Create a new health monitor
    pub fn new(config: HealthConfig) -> Result<Self, HealthError> {
        config.validate()?;
        info!("Creating health monitor with config: {:?}", config);
        Ok(Self {
            config,
            band: HealthBand::Unknown,
            last_rul: f64::NAN,
            transitions: 0,
            last_change: Instant::now(),
        })
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Classify `rul` and record a transition when the band changes
    pub fn observe(&mut self, rul: f64) -> HealthBand {
        let next = self.config.classify(rul);
        self.last_rul = rul;

        if next != self.band {
            if self.band.degrades_to(next) {
                warn!(
                    "Health degraded: {} -> {} (rul={:.1})",
                    self.band.as_str(),
                    next.as_str(),
                    rul
                );
            } else {
                info!("Health changed: {} -> {} (rul={:.1})", self.band.as_str(), next.as_str(), rul);
            }
            self.band = next;
            self.transitions += 1;
            self.last_change = Instant::now();
        } else {
            debug!("Health unchanged: {} (rul={:.1})", next.as_str(), rul);
        }

        next
    }

    pub fn band(&self) -> HealthBand {
        self.band
    }

    pub fn last_rul(&self) -> f64 {
        self.last_rul
    }

    pub fn transitions(&self) -> usize {
        self.transitions
    }

    pub fn status(&self) -> HealthStatus {
        HealthStatus {
            band: self.band,
            label: self.band.as_str().to_string(),
            message: self.band.message().to_string(),
            rul: self.last_rul,
            transitions: self.transitions,
            seconds_in_band: self.last_change.elapsed().as_secs(),
        }
    }

    /// Forget history, back to `Unknown`
    pub fn reset(&mut self) {
        self.band = HealthBand::Unknown;
        self.last_rul = f64::NAN;
        self.transitions = 0;
        self.last_change = Instant::now();
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self {
            config: HealthConfig::default(),
            band: HealthBand::Unknown,
            last_rul: f64::NAN,
            transitions: 0,
            last_change: Instant::now(),
        }
    }
}
