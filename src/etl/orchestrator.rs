//! ETL run orchestration.
//!
//! A run refreshes every dimension, builds the dimension index, then runs
//! each fact loader in turn. Dimension failures stop the run before any fact
//! is touched. Fact failures are isolated: the failing loader's open batch
//! rolls back, its watermark stays put, and the next loader still runs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::EtlError;
use crate::storage::{Pool, WatermarkStore};

use super::dimensions::{self, DimensionLoader};
use super::facts::{self, DimensionIndex, FactContext, FactLoader};
use super::{EtlSettings, LoadContext, LoadStats};

/// Overall result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every loader completed.
    Succeeded,
    /// Dimensions loaded, but at least one fact loader failed.
    Degraded,
    /// The dimension phase failed, or no fact loader completed.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoaderOutcome {
    Completed(LoadStats),
    Failed { error: String },
    NotRun,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoaderReport {
    pub table: &'static str,
    #[serde(flatten)]
    pub outcome: LoaderOutcome,
}

impl LoaderReport {
    fn not_run(table: &'static str) -> Self {
        Self {
            table,
            outcome: LoaderOutcome::NotRun,
        }
    }

    pub fn stats(&self) -> Option<&LoadStats> {
        match &self.outcome {
            LoaderOutcome::Completed(stats) => Some(stats),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, LoaderOutcome::Failed { .. })
    }
}

/// What one run did, per loader.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: RunStatus,
    pub dimensions: Vec<LoaderReport>,
    pub facts: Vec<LoaderReport>,
}

impl RunReport {
    pub fn fact(&self, table: &str) -> Option<&LoaderReport> {
        self.facts.iter().find(|r| r.table == table)
    }

    pub fn dimension(&self, table: &str) -> Option<&LoaderReport> {
        self.dimensions.iter().find(|r| r.table == table)
    }

    /// Fact rows written across all loaders.
    pub fn facts_written(&self) -> u64 {
        self.facts
            .iter()
            .filter_map(LoaderReport::stats)
            .map(|s| s.written)
            .sum()
    }
}

/// Runs dimension and fact loaders against one source and one warehouse.
pub struct EtlOrchestrator {
    source: Pool,
    warehouse: Pool,
    watermarks: Arc<dyn WatermarkStore>,
    settings: EtlSettings,
    dimensions: Vec<Box<dyn DimensionLoader>>,
    facts: Vec<Box<dyn FactLoader>>,
}

impl EtlOrchestrator {
    pub fn new(
        source: Pool,
        warehouse: Pool,
        watermarks: Arc<dyn WatermarkStore>,
        settings: EtlSettings,
    ) -> Self {
        Self {
            source,
            warehouse,
            watermarks,
            settings,
            dimensions: dimensions::default_loaders(),
            facts: facts::default_loaders(),
        }
    }

    /// Replace the dimension loaders.
    pub fn with_dimension_loaders(mut self, loaders: Vec<Box<dyn DimensionLoader>>) -> Self {
        self.dimensions = loaders;
        self
    }

    /// Replace the fact loaders.
    pub fn with_fact_loaders(mut self, loaders: Vec<Box<dyn FactLoader>>) -> Self {
        self.facts = loaders;
        self
    }

    pub fn settings(&self) -> &EtlSettings {
        &self.settings
    }

    /// Execute one full run. Never retries; errors end up in the report.
    pub async fn run(&self) -> RunReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("etl_run", %run_id);
        self.execute(run_id).instrument(span).await
    }

    async fn execute(&self, run_id: Uuid) -> RunReport {
        let started_at = Utc::now();
        info!(batch_size = self.settings.batch_size, full_reload = self.settings.full_reload, "ETL run starting");

        let load_ctx = LoadContext {
            source: &self.source,
            warehouse: &self.warehouse,
            settings: &self.settings,
            loaded_at: started_at,
        };

        let (dimensions, dims_ok) = self.load_dimensions(&load_ctx).await;

        let index = if dims_ok {
            match DimensionIndex::load(&self.warehouse).await {
                Ok(index) => Some(index),
                Err(e) => {
                    error!(error = %e, "Dimension index could not be built");
                    None
                }
            }
        } else {
            None
        };

        let facts = match &index {
            Some(index) => {
                let fact_ctx = FactContext {
                    source: &self.source,
                    warehouse: &self.warehouse,
                    watermarks: self.watermarks.as_ref(),
                    settings: &self.settings,
                    dims: index,
                    loaded_at: started_at,
                };
                self.load_facts(&fact_ctx).await
            }
            None => {
                warn!("Skipping fact loaders after dimension failure");
                self.facts
                    .iter()
                    .map(|loader| LoaderReport::not_run(loader.table()))
                    .collect()
            }
        };

        let status = if index.is_none() {
            RunStatus::Failed
        } else if !facts.is_empty() && facts.iter().all(LoaderReport::is_failed) {
            RunStatus::Failed
        } else if facts.iter().any(LoaderReport::is_failed) {
            RunStatus::Degraded
        } else {
            RunStatus::Succeeded
        };

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            status,
            dimensions,
            facts,
        };

        match status {
            RunStatus::Succeeded => info!(facts_written = report.facts_written(), "ETL run succeeded"),
            RunStatus::Degraded => warn!(facts_written = report.facts_written(), "ETL run degraded"),
            RunStatus::Failed => error!("ETL run failed"),
        }
        report
    }

    /// Returns the per-loader reports and whether every loader completed.
    async fn load_dimensions(&self, ctx: &LoadContext<'_>) -> (Vec<LoaderReport>, bool) {
        let mut reports = Vec::with_capacity(self.dimensions.len());
        let mut failed = false;

        for loader in &self.dimensions {
            let table = loader.table();
            if failed {
                reports.push(LoaderReport::not_run(table));
                continue;
            }
            let outcome = match loader.load(ctx).await {
                Ok(stats) => LoaderOutcome::Completed(stats),
                Err(e) => {
                    let e = EtlError::Dimension {
                        table,
                        source: Box::new(e),
                    };
                    error!(table, error = %e, "Dimension load failed");
                    failed = true;
                    LoaderOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            reports.push(LoaderReport { table, outcome });
        }
        (reports, !failed)
    }

    async fn load_facts(&self, ctx: &FactContext<'_>) -> Vec<LoaderReport> {
        let mut reports = Vec::with_capacity(self.facts.len());
        for loader in &self.facts {
            let table = loader.table();
            let outcome = match loader.load(ctx).await {
                Ok(stats) => LoaderOutcome::Completed(stats),
                Err(e) => {
                    error!(table, error = %e, "Fact load failed; watermark not advanced");
                    LoaderOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            reports.push(LoaderReport { table, outcome });
        }
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_serializes_outcomes() {
        let report = LoaderReport {
            table: "fact_revenue",
            outcome: LoaderOutcome::Failed {
                error: "boom".to_string(),
            },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["table"], "fact_revenue");
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["error"], "boom");

        let json = serde_json::to_value(LoaderReport::not_run("fact_revenue")).unwrap();
        assert_eq!(json["outcome"], "not_run");
    }

    #[test]
    fn test_completed_report_exposes_stats() {
        let report = LoaderReport {
            table: "dim_film",
            outcome: LoaderOutcome::Completed(LoadStats {
                written: 4,
                ..Default::default()
            }),
        };
        assert_eq!(report.stats().map(|s| s.written), Some(4));
        assert!(!report.is_failed());
        assert_eq!(
            serde_json::to_value(RunStatus::Degraded).unwrap(),
            "degraded"
        );
    }
}
