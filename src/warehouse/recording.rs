// src/warehouse/recording.rs

use super::{Batch, BatchReport, CommitMode, StatementOutcome, Warehouse};
use crate::error::{EtlError, Result};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    Begin,
    Execute { name: String, sql: String },
    Commit,
    Rollback,
    Close,
}

/// In-memory warehouse that records what it was asked to do.
///
/// The event log is shared so tests can inspect it after the warehouse has
/// been consumed by `close`.
pub(crate) struct RecordingWarehouse {
    commit: CommitMode,
    fail_on: Option<String>,
    log: Arc<Mutex<Vec<Event>>>,
}

impl RecordingWarehouse {
    pub(crate) fn new(commit: CommitMode) -> Self {
        Self {
            commit,
            fail_on: None,
            log: Arc::default(),
        }
    }

    /// Make the statement called `name` fail.
    pub(crate) fn failing_on(mut self, name: &str) -> Self {
        self.fail_on = Some(name.to_string());
        self
    }

    pub(crate) fn log(&self) -> Arc<Mutex<Vec<Event>>> {
        Arc::clone(&self.log)
    }

    fn push(&self, event: Event) {
        self.log.lock().unwrap().push(event);
    }
}

impl Warehouse for RecordingWarehouse {
    fn commit_mode(&self) -> CommitMode {
        self.commit
    }

    async fn run(&mut self, batch: &Batch) -> Result<BatchReport> {
        let atomic = self.commit == CommitMode::Atomic;
        if atomic {
            self.push(Event::Begin);
        }

        let mut report = BatchReport::new(batch.name);
        for stmt in &batch.statements {
            if self.fail_on.as_deref() == Some(stmt.name.as_str()) {
                if atomic {
                    self.push(Event::Rollback);
                }
                return Err(EtlError::Statement {
                    name: stmt.name.clone(),
                    source: sqlx::Error::Protocol(format!("injected failure in {}", stmt.name)),
                });
            }
            self.push(Event::Execute {
                name: stmt.name.clone(),
                sql: stmt.sql.clone(),
            });
            if !atomic {
                self.push(Event::Commit);
            }
            report.outcomes.push(StatementOutcome {
                name: stmt.name.clone(),
                rows_affected: 1,
                elapsed: Duration::ZERO,
            });
        }

        if atomic {
            self.push(Event::Commit);
        }
        Ok(report)
    }

    async fn close(self) -> Result<()> {
        self.push(Event::Close);
        Ok(())
    }
}

/// Names of the executed statements, in order.
pub(crate) fn executed(log: &Mutex<Vec<Event>>) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            Event::Execute { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect()
}
