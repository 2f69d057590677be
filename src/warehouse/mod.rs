//! The one seam between the ETL steps and the database.
//!
//! Every step builds a [`Batch`] of plain SQL statements and hands it to a
//! [`Warehouse`], which runs them in order on a single connection and decides
//! where the commits go according to its [`CommitMode`].

pub mod postgres;
#[cfg(test)]
pub(crate) mod recording;

pub use postgres::PgWarehouse;

use crate::error::Result;
use serde::Deserialize;
use std::{fmt, time::Duration};

/// A named SQL statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub name: String,
    pub sql: String,
}

impl Statement {
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
        }
    }
}

/// An ordered list of statements making up one ETL step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub name: &'static str,
    pub statements: Vec<Statement>,
}

impl Batch {
    pub fn new(name: &'static str, statements: Vec<Statement>) -> Self {
        Self { name, statements }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementOutcome {
    pub name: String,
    pub rows_affected: u64,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub batch: &'static str,
    pub outcomes: Vec<StatementOutcome>,
}

impl BatchReport {
    pub fn new(batch: &'static str) -> Self {
        Self {
            batch,
            outcomes: Vec::new(),
        }
    }

    pub fn total_rows(&self) -> u64 {
        self.outcomes.iter().map(|o| o.rows_affected).sum()
    }

    pub fn elapsed(&self) -> Duration {
        self.outcomes.iter().map(|o| o.elapsed).sum()
    }
}

/// Where commits happen while a batch runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    /// Every statement is its own transaction. A failure leaves the
    /// statements before it committed.
    #[default]
    PerStatement,
    /// The whole batch is one transaction; a failure rolls it all back.
    Atomic,
}

impl CommitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitMode::PerStatement => "per_statement",
            CommitMode::Atomic => "atomic",
        }
    }
}

impl fmt::Display for CommitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single warehouse connection.
///
/// Implementations run statements strictly in order and stop at the first
/// failure, returning it untouched. Nothing is retried.
#[allow(async_fn_in_trait)]
pub trait Warehouse {
    fn commit_mode(&self) -> CommitMode;

    async fn run(&mut self, batch: &Batch) -> Result<BatchReport>;

    /// Release the connection. Called on every exit path.
    async fn close(self) -> Result<()>
    where
        Self: Sized;
}
