//! Predictive Maintenance Dashboard
//!
//! Replays a featurized turbofan sensor log through the RUL model on a
//! fixed timer and serves readouts, plots and health status over HTTP.

use alerting::HealthMonitor;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use feature_engine::{FeatureExtractor, FeaturePipeline};
use inference_engine::InferenceEngine;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sensor_data::load_table;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

pub mod config;
mod error;
pub mod monitor;
mod routes;

pub use config::{AppConfig, DashboardConfig};
pub use error::DashboardError;
pub use monitor::{Monitor, MonitorSettings, RulPoint, SensorPoint, SensorReading, TickOutcome};

/// Device details shown next to the readouts
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub id: String,
}

/// Application state shared across handlers and the poll loop
pub struct AppState {
    pub monitor: Monitor,
    pub device: DeviceInfo,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
    /// Prometheus render handle when the recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

pub type SharedState = Arc<RwLock<AppState>>;

impl AppState {
    /// Create new application state
    pub fn new(monitor: Monitor, device: DeviceInfo) -> Self {
        Self {
            monitor,
            device,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
            metrics: None,
        }
    }
}

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: ComponentStatus,
    pub metrics: SystemMetrics,
}

/// Component status
#[derive(Debug, Serialize, Deserialize)]
pub struct ComponentStatus {
    pub replay: ComponentHealth,
    pub inference: ComponentHealth,
}

/// Individual component health
#[derive(Debug, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    pub detail: String,
    pub last_latency_ms: Option<u64>,
}

/// System metrics
#[derive(Debug, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub rows_processed: usize,
    pub total_rows: usize,
    pub prediction_count: usize,
}

/// Create the application router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/sensors/live", get(routes::sensors::get_live))
        .route("/api/v1/predictions", get(routes::predictions::get_predictions))
        .route("/api/v1/status", get(routes::status::get_status))
        .route("/api/v1/monitoring/start", post(routes::status::start))
        .route("/api/v1/monitoring/stop", post(routes::status::stop))
        .route("/metrics", get(metrics_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let state = state.read().await;
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let monitor = &state.monitor;
    let replay_status = if monitor.is_running() {
        "running"
    } else if monitor.is_finished() {
        "finished"
    } else {
        "stopped"
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        components: ComponentStatus {
            replay: ComponentHealth {
                status: replay_status.to_string(),
                detail: format!("{}/{} rows", monitor.cursor(), monitor.total_rows()),
                last_latency_ms: None,
            },
            inference: ComponentHealth {
                status: "ok".to_string(),
                detail: monitor.model_name().to_string(),
                last_latency_ms: monitor.last_latency_ms(),
            },
        },
        metrics: SystemMetrics {
            rows_processed: monitor.cursor(),
            total_rows: monitor.total_rows(),
            prediction_count: monitor.prediction_count(),
        },
    })
}

/// Prometheus text exposition
async fn metrics_handler(State(state): State<SharedState>) -> Response {
    let state = state.read().await;
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}

/// Initialize logging; returns false when a subscriber was already installed
pub fn init_logging(json: bool) -> bool {
    let result = if json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::INFO)
            .with_target(true)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::INFO)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    };

    match result {
        Ok(()) => true,
        Err(_) => {
            warn!("Tracing subscriber already installed, keeping the existing one");
            false
        }
    }
}

/// Install the global Prometheus recorder
pub fn install_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics recorder not installed: {}", e);
            None
        }
    }
}

/// Load, featurize, persist the derived artifact and build the monitor
pub fn bootstrap(config: &AppConfig) -> Result<AppState, DashboardError> {
    let mut table = load_table(&config.data)?;
    let report = FeaturePipeline::new(config.features.clone()).run(&mut table)?;
    info!(
        "Derived {} feature columns, dropped {}",
        report.derived_columns.len(),
        report.dropped_columns.len()
    );

    if let Some(path) = &config.dashboard.feature_output_path {
        table.write_csv(path)?;
    }

    let dashboard = &config.dashboard;
    let channels = if dashboard.channels.is_empty() {
        report.derived_columns.clone()
    } else {
        dashboard.channels.clone()
    };
    let readout_columns = if dashboard.readout_columns.is_empty() {
        channels.clone()
    } else {
        dashboard.readout_columns.clone()
    };
    let plot_column = dashboard
        .plot_column
        .clone()
        .or_else(|| readout_columns.first().cloned())
        .ok_or_else(|| DashboardError::Config("no column to plot".to_string()))?;

    let frequency = config.features.frequency;
    let engine = InferenceEngine::from_config(&config.model, &frequency)?;
    let health = HealthMonitor::new(config.health.clone())?;

    let monitor = Monitor::new(
        table,
        MonitorSettings {
            channels,
            readout_columns,
            plot_column,
            unit_column: Some(config.features.unit_column.clone()),
            replay_unit: dashboard.replay_unit,
            history_len: dashboard.history_len,
        },
        FeatureExtractor::new(frequency),
        engine,
        health,
    )?;

    Ok(AppState::new(
        monitor,
        DeviceInfo {
            name: dashboard.device_name.clone(),
            id: dashboard.device_id.clone(),
        },
    ))
}

/// Advance the monitor once per `period` until the task is dropped
pub async fn poll_loop(state: SharedState, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        let mut guard = state.write().await;
        if let Err(e) = guard.monitor.tick() {
            error!("Monitoring tick failed: {}", e);
            guard.monitor.stop();
        }
    }
}

/// Run the server
pub async fn run_server(config: AppConfig) -> Result<(), DashboardError> {
    let metrics = if config.dashboard.metrics { install_metrics() } else { None };

    let mut state = bootstrap(&config)?;
    state.metrics = metrics;
    if config.dashboard.autostart {
        state.monitor.start();
    }

    let state = Arc::new(RwLock::new(state));
    let period = Duration::from_millis(config.dashboard.poll_interval_ms);
    let poller = tokio::spawn(poll_loop(state.clone(), period));
    let app = create_router(state);

    info!("Starting dashboard server on {}", config.dashboard.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.dashboard.bind_addr).await?;
    let served = axum::serve(listener, app).await;
    poller.abort();
    served?;

    Ok(())
}
