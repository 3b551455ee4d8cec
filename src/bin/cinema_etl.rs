//! cinema-etl: one ETL run
//!
//! Loads configuration, connects to the source and the warehouse, runs
//! every dimension and fact loader once, and prints the run report as JSON.
//!
//! ## Configuration
//! - CINEMA_ETL_CONFIG: Path to a YAML config file (optional)
//! - CINEMA_ETL__SOURCE__URL / CINEMA_ETL__WAREHOUSE__URL: Database URLs
//! - CINEMA_ETL__ETL__FULL_RELOAD: Rescan facts from the epoch
//! - CINEMA_ETL_LOG: Log filter (default: info)
//!
//! Exits 0 when the run succeeded, 1 when it was degraded or failed.

use std::process::ExitCode;

use tracing::info;

use cinema_etl::config::Config;
use cinema_etl::utils::bootstrap::{build_orchestrator, init_tracing};
use cinema_etl::RunStatus;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    init_tracing();

    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref())?;

    let orchestrator = build_orchestrator(&config).await?;
    let report = orchestrator.run().await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    info!(run_id = %report.run_id, status = ?report.status, "cinema-etl finished");

    Ok(match report.status {
        RunStatus::Succeeded => ExitCode::SUCCESS,
        RunStatus::Degraded | RunStatus::Failed => ExitCode::FAILURE,
    })
}
