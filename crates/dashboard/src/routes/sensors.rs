//! Sensor Routes

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::monitor::{SensorPoint, SensorReading};
use crate::SharedState;

/// Query parameters for sensors endpoint
#[derive(Debug, Deserialize)]
pub struct SensorQuery {
    /// Maximum number of plot points to return
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

/// Device details panel
#[derive(Debug, Serialize, Deserialize)]
pub struct DeviceDetails {
    pub name: String,
    pub id: String,
    pub status: String,
    pub message: String,
}

/// Response for sensors endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct SensorResponse {
    pub device: DeviceDetails,
    /// Latest readouts, absent before the first tick
    pub reading: Option<SensorReading>,
    /// Sensor plot series
    pub plot: SensorPlot,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SensorPlot {
    pub column: String,
    pub data: Vec<SensorPoint>,
    pub count: usize,
    pub limit: usize,
}

/// Get live sensor readouts and plot
pub async fn get_live(State(state): State<SharedState>, Query(params): Query<SensorQuery>) -> Json<SensorResponse> {
    let state = state.read().await;
    let limit = params.limit.min(1000);
    let health = state.monitor.health();
    let data = state.monitor.sensor_history(limit);

    Json(SensorResponse {
        device: DeviceDetails {
            name: state.device.name.clone(),
            id: state.device.id.clone(),
            status: health.label,
            message: health.message,
        },
        reading: state.monitor.latest().cloned(),
        plot: SensorPlot {
            column: state.monitor.settings().plot_column.clone(),
            count: data.len(),
            limit,
            data,
        },
    })
}
