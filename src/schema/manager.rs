// src/schema/manager.rs

use super::tables::{definition, CREATE_ORDER, DROP_ORDER};
use super::types::Dialect;
use crate::error::Result;
use crate::warehouse::{Batch, BatchReport, Statement, Warehouse};
use tracing::{info, instrument};

pub fn drop_batch() -> Batch {
    let statements = DROP_ORDER
        .iter()
        .map(|t| Statement::new(format!("drop_{t}"), definition(*t).drop_sql()))
        .collect();
    Batch::new("drop_tables", statements)
}

pub fn create_batch(dialect: Dialect) -> Batch {
    let statements = CREATE_ORDER
        .iter()
        .map(|t| Statement::new(format!("create_{t}"), definition(*t).create_sql(dialect)))
        .collect();
    Batch::new("create_tables", statements)
}

/// Drop every table that exists. Safe to repeat.
#[instrument(skip_all)]
pub async fn drop_all<W: Warehouse>(warehouse: &mut W) -> Result<BatchReport> {
    let report = warehouse.run(&drop_batch()).await?;
    info!(tables = report.outcomes.len(), "tables dropped");
    Ok(report)
}

/// Create every table that is missing, dimensions before the fact table.
#[instrument(skip_all, fields(dialect = %dialect))]
pub async fn create_all<W: Warehouse>(warehouse: &mut W, dialect: Dialect) -> Result<BatchReport> {
    let report = warehouse.run(&create_batch(dialect)).await?;
    info!(tables = report.outcomes.len(), "tables created");
    Ok(report)
}
