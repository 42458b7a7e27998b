//! Turbofan RUL Dashboard - Main Entry Point

use dashboard::{init_logging, run_server, AppConfig};
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = AppConfig::path_from_env();
    let config = AppConfig::load(&path)?;
    init_logging(config.dashboard.log_json);

    info!("=== Turbofan RUL Dashboard v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {}", path.display());

    run_server(config).await?;

    Ok(())
}
