// src/pipeline.rs
//
// The two entry sequences. Each opens exactly one connection, runs its steps
// in order, and closes the connection whether or not a step failed.

use crate::config::Config;
use crate::error::{EtlError, Result};
use crate::warehouse::{BatchReport, PgWarehouse, Warehouse};
use crate::{schema, stage, transform};
use std::time::Duration;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub reports: Vec<BatchReport>,
}

impl RunSummary {
    pub fn statements(&self) -> usize {
        self.reports.iter().map(|r| r.outcomes.len()).sum()
    }

    pub fn total_rows(&self) -> u64 {
        self.reports.iter().map(BatchReport::total_rows).sum()
    }

    pub fn elapsed(&self) -> Duration {
        self.reports.iter().map(BatchReport::elapsed).sum()
    }
}

/// Entry point 1: drop and recreate every table.
pub async fn reset_schema(config: &Config) -> Result<RunSummary> {
    let warehouse = PgWarehouse::connect(&config.cluster, config.etl.commit).await?;
    reset_schema_on(warehouse, config).await
}

/// Entry point 2: load staging from S3, then fill the star schema.
pub async fn run_etl(config: &Config) -> Result<RunSummary> {
    let warehouse = PgWarehouse::connect(&config.cluster, config.etl.commit).await?;
    run_etl_on(warehouse, config).await
}

#[instrument(skip_all, fields(dialect = %config.etl.dialect))]
pub async fn reset_schema_on<W: Warehouse>(mut warehouse: W, config: &Config) -> Result<RunSummary> {
    info!(commit = %warehouse.commit_mode(), "resetting schema");
    let outcome = async {
        let mut summary = RunSummary::default();
        summary.reports.push(schema::drop_all(&mut warehouse).await?);
        summary
            .reports
            .push(schema::create_all(&mut warehouse, config.etl.dialect).await?);
        Ok::<_, EtlError>(summary)
    }
    .await;
    finish(warehouse, outcome).await
}

#[instrument(skip_all, fields(dedup = %config.etl.songplay_dedup))]
pub async fn run_etl_on<W: Warehouse>(mut warehouse: W, config: &Config) -> Result<RunSummary> {
    info!(commit = %warehouse.commit_mode(), "loading warehouse");
    let outcome = async {
        let mut summary = RunSummary::default();
        summary
            .reports
            .push(stage::load_staging(&mut warehouse, config).await?);
        summary
            .reports
            .push(transform::run_inserts(&mut warehouse, config.etl.songplay_dedup).await?);
        Ok::<_, EtlError>(summary)
    }
    .await;
    finish(warehouse, outcome).await
}

/// Close the connection. A step failure wins over a close failure.
async fn finish<W: Warehouse>(warehouse: W, outcome: Result<RunSummary>) -> Result<RunSummary> {
    let closed = warehouse.close().await;
    match (outcome, closed) {
        (Ok(summary), Ok(())) => {
            info!(
                statements = summary.statements(),
                rows = summary.total_rows(),
                elapsed = ?summary.elapsed(),
                "run complete"
            );
            Ok(summary)
        }
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            warn!(error = %close_err, "closing after failure also failed");
            Err(e)
        }
    }
}
