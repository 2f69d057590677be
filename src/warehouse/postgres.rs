// src/warehouse/postgres.rs

use super::{Batch, BatchReport, CommitMode, Statement, StatementOutcome, Warehouse};
use crate::config::{ClusterConfig, SslMode};
use crate::error::{EtlError, Result};
use sqlx::{
    postgres::{PgConnectOptions, PgConnection, PgSslMode},
    Connection,
};
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Warehouse backed by one `sqlx` Postgres-protocol connection.
///
/// Statements go over the simple-query protocol so Redshift-only commands
/// such as `COPY ... IAM_ROLE` pass through untouched.
pub struct PgWarehouse {
    conn: PgConnection,
    commit: CommitMode,
}

impl PgWarehouse {
    #[instrument(skip_all, fields(host = %cluster.host, port = cluster.db_port, db = %cluster.db_name))]
    pub async fn connect(cluster: &ClusterConfig, commit: CommitMode) -> Result<Self> {
        let conn = PgConnection::connect_with(&connect_options(cluster))
            .await
            .map_err(|source| EtlError::Connection {
                host: cluster.host.clone(),
                port: cluster.db_port,
                source,
            })?;
        info!(commit = %commit, "connected to warehouse");
        Ok(Self::from_connection(conn, commit))
    }

    /// Wrap an already open connection.
    pub fn from_connection(conn: PgConnection, commit: CommitMode) -> Self {
        Self { conn, commit }
    }

    async fn run_autocommit(&mut self, batch: &Batch) -> Result<BatchReport> {
        let mut report = BatchReport::new(batch.name);
        for stmt in &batch.statements {
            let outcome = execute(&mut self.conn, batch.name, stmt).await?;
            report.outcomes.push(outcome);
        }
        Ok(report)
    }

    async fn run_atomic(&mut self, batch: &Batch) -> Result<BatchReport> {
        let tx_err = |source: sqlx::Error| EtlError::Transaction {
            batch: batch.name.to_string(),
            source,
        };

        // dropping `tx` on an early return rolls the batch back
        let mut tx = self.conn.begin().await.map_err(tx_err)?;
        let mut report = BatchReport::new(batch.name);
        for stmt in &batch.statements {
            let outcome = execute(&mut *tx, batch.name, stmt).await?;
            report.outcomes.push(outcome);
        }
        tx.commit().await.map_err(tx_err)?;
        debug!(batch = batch.name, "batch committed");
        Ok(report)
    }
}

impl Warehouse for PgWarehouse {
    fn commit_mode(&self) -> CommitMode {
        self.commit
    }

    async fn run(&mut self, batch: &Batch) -> Result<BatchReport> {
        match self.commit {
            CommitMode::PerStatement => self.run_autocommit(batch).await,
            CommitMode::Atomic => self.run_atomic(batch).await,
        }
    }

    async fn close(self) -> Result<()> {
        self.conn.close().await.map_err(EtlError::Close)?;
        info!("warehouse connection closed");
        Ok(())
    }
}

async fn execute(
    conn: &mut PgConnection,
    batch: &'static str,
    stmt: &Statement,
) -> Result<StatementOutcome> {
    let start = Instant::now();
    debug!(batch, statement = %stmt.name, sql = %stmt.sql, "executing");
    let done = sqlx::raw_sql(&stmt.sql)
        .execute(&mut *conn)
        .await
        .map_err(|source| EtlError::Statement {
            name: stmt.name.clone(),
            source,
        })?;
    let elapsed = start.elapsed();
    info!(
        batch,
        statement = %stmt.name,
        rows = done.rows_affected(),
        elapsed = ?elapsed,
        "statement done"
    );
    Ok(StatementOutcome {
        name: stmt.name.clone(),
        rows_affected: done.rows_affected(),
        elapsed,
    })
}

pub(crate) fn connect_options(cluster: &ClusterConfig) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&cluster.host)
        .port(cluster.db_port)
        .database(&cluster.db_name)
        .username(&cluster.db_user)
        .password(&cluster.db_password)
        .ssl_mode(pg_ssl_mode(cluster.ssl_mode))
        .application_name(env!("CARGO_PKG_NAME"))
}

fn pg_ssl_mode(mode: SslMode) -> PgSslMode {
    match mode {
        SslMode::Disable => PgSslMode::Disable,
        SslMode::Allow => PgSslMode::Allow,
        SslMode::Prefer => PgSslMode::Prefer,
        SslMode::Require => PgSslMode::Require,
        SslMode::VerifyCa => PgSslMode::VerifyCa,
        SslMode::VerifyFull => PgSslMode::VerifyFull,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_carry_cluster_fields() {
        let cluster = ClusterConfig {
            host: "dwh.example.com".into(),
            db_name: "dwh".into(),
            db_user: "etl".into(),
            db_password: "secret".into(),
            db_port: 5439,
            ssl_mode: SslMode::Require,
        };
        let opts = connect_options(&cluster);
        assert_eq!(opts.get_host(), "dwh.example.com");
        assert_eq!(opts.get_port(), 5439);
        assert_eq!(opts.get_database(), Some("dwh"));
        assert_eq!(opts.get_username(), "etl");
        assert!(matches!(opts.get_ssl_mode(), PgSslMode::Require));
    }
}
