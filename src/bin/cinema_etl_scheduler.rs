//! cinema-etl-scheduler: periodic ETL runs
//!
//! Runs the ETL once at startup (unless `schedule.run_on_start` is false),
//! then once per `schedule.interval_secs` until Ctrl+C. Each run is awaited
//! before the next tick, and ticks missed while a run is in progress are
//! skipped, so runs never overlap.
//!
//! ## Configuration
//! Same sources as `cinema-etl`, plus:
//! - CINEMA_ETL__SCHEDULE__INTERVAL_SECS: Seconds between runs (default: 3600)
//! - CINEMA_ETL__SCHEDULE__RUN_ON_START: Run immediately (default: true)

use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use cinema_etl::config::Config;
use cinema_etl::utils::bootstrap::{build_orchestrator, init_tracing};
use cinema_etl::RunStatus;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref())?;
    let orchestrator = build_orchestrator(&config).await?;

    let mut ticker = interval(Duration::from_secs(config.schedule.interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    if !config.schedule.run_on_start {
        // The first tick of an interval completes immediately.
        ticker.tick().await;
    }

    info!(
        interval_secs = config.schedule.interval_secs,
        run_on_start = config.schedule.run_on_start,
        "cinema-etl-scheduler started"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = orchestrator.run().await;
                match report.status {
                    RunStatus::Succeeded => {
                        info!(run_id = %report.run_id, facts_written = report.facts_written(), "Scheduled run finished");
                    }
                    status => {
                        warn!(run_id = %report.run_id, ?status, "Scheduled run did not fully succeed");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}
