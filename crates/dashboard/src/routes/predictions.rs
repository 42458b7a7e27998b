//! Prediction Routes

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::monitor::RulPoint;
use crate::SharedState;

/// Query parameters for predictions endpoint
#[derive(Debug, Deserialize)]
pub struct PredictionQuery {
    /// Maximum number of records
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// Response for predictions endpoint (health plot)
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub data: Vec<RulPoint>,
    pub count: usize,
    pub model: String,
}

/// Get recent RUL predictions
pub async fn get_predictions(
    State(state): State<SharedState>,
    Query(params): Query<PredictionQuery>,
) -> Json<PredictionResponse> {
    let state = state.read().await;
    let limit = params.limit.min(500);
    let data = state.monitor.rul_history(limit);

    Json(PredictionResponse {
        count: data.len(),
        model: state.monitor.model_name().to_string(),
        data,
    })
}
