//! Status and Monitoring Control Routes

use alerting::HealthStatus;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::SharedState;

/// Replay progress
#[derive(Debug, Serialize, Deserialize)]
pub struct MonitoringState {
    pub running: bool,
    pub cursor: usize,
    pub total_rows: usize,
    pub predictions: usize,
}

/// Response for status endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub health: HealthStatus,
    pub monitoring: MonitoringState,
}

/// Response for start/stop
#[derive(Debug, Serialize, Deserialize)]
pub struct ControlResponse {
    /// Whether the request changed anything
    pub changed: bool,
    pub monitoring: MonitoringState,
}

fn monitoring_state(state: &crate::AppState) -> MonitoringState {
    MonitoringState {
        running: state.monitor.is_running(),
        cursor: state.monitor.cursor(),
        total_rows: state.monitor.total_rows(),
        predictions: state.monitor.prediction_count(),
    }
}

/// Current health band
pub async fn get_status(State(state): State<SharedState>) -> Json<StatusResponse> {
    let state = state.read().await;
    Json(StatusResponse {
        health: state.monitor.health(),
        monitoring: monitoring_state(&state),
    })
}

/// Start monitoring
pub async fn start(State(state): State<SharedState>) -> Json<ControlResponse> {
    let mut state = state.write().await;
    let changed = state.monitor.start();
    info!("Start requested (changed: {})", changed);
    Json(ControlResponse {
        changed,
        monitoring: monitoring_state(&state),
    })
}

/// Stop monitoring
pub async fn stop(State(state): State<SharedState>) -> Json<ControlResponse> {
    let mut state = state.write().await;
    let changed = state.monitor.stop();
    info!("Stop requested (changed: {})", changed);
    Json(ControlResponse {
        changed,
        monitoring: monitoring_state(&state),
    })
}
