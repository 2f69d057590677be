//! Bulk-loads the raw S3 JSON into the staging tables with Redshift `COPY`.
//!
//! Staging tables are appended to, never truncated: running the load twice
//! doubles the staging rows, and the inserts downstream absorb that.

use crate::config::Config;
use crate::error::Result;
use crate::schema::Table;
use crate::warehouse::{Batch, BatchReport, Statement, Warehouse};
use tracing::{info, instrument};

/// `COPY stage_events`: log JSON mapped through a JSONPaths file, `ts` in
/// epoch milliseconds.
pub fn copy_events(config: &Config) -> Statement {
    let s = &config.storage;
    let sql = format!(
        "COPY {table}\n\
         FROM {source}\n\
         IAM_ROLE {role}\n\
         FORMAT AS JSON {jsonpath}\n\
         REGION {region}\n\
         TIMEFORMAT AS 'epochmillisecs';",
        table = Table::StageEvents,
        source = quote_literal(&s.log_data),
        role = quote_literal(&config.iam_role_arn),
        jsonpath = quote_literal(&s.log_jsonpath),
        region = quote_literal(&s.region),
    );
    Statement::new(format!("copy_{}", Table::StageEvents), sql)
}

/// `COPY stage_songs`: song JSON with keys matched to columns by name.
pub fn copy_songs(config: &Config) -> Statement {
    let s = &config.storage;
    let sql = format!(
        "COPY {table}\n\
         FROM {source}\n\
         IAM_ROLE {role}\n\
         FORMAT AS JSON 'auto'\n\
         REGION {region};",
        table = Table::StageSongs,
        source = quote_literal(&s.song_data),
        role = quote_literal(&config.iam_role_arn),
        region = quote_literal(&s.region),
    );
    Statement::new(format!("copy_{}", Table::StageSongs), sql)
}

pub fn copy_batch(config: &Config) -> Batch {
    Batch::new("load_staging", vec![copy_events(config), copy_songs(config)])
}

#[instrument(skip_all)]
pub async fn load_staging<W: Warehouse>(warehouse: &mut W, config: &Config) -> Result<BatchReport> {
    let report = warehouse.run(&copy_batch(config)).await?;
    info!(rows = report.total_rows(), elapsed = ?report.elapsed(), "staging loaded");
    Ok(report)
}

/// Single-quoted SQL string literal.
pub fn quote_literal(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::recording::{executed, Event, RecordingWarehouse};
    use crate::warehouse::CommitMode;

    fn config() -> Config {
        Config::sample()
    }

    #[test]
    fn events_copy_uses_jsonpaths_and_epoch_millis() {
        let sql = copy_events(&config()).sql;
        assert!(sql.starts_with("COPY stage_events\nFROM 's3://udacity-dend/log_data'\n"));
        assert!(sql.contains("IAM_ROLE 'arn:aws:iam::123456789012:role/dwhRole'"));
        assert!(sql.contains("FORMAT AS JSON 's3://udacity-dend/log_json_path.json'"));
        assert!(sql.contains("REGION 'us-west-2'"));
        assert!(sql.ends_with("TIMEFORMAT AS 'epochmillisecs';"));
    }

    #[test]
    fn songs_copy_uses_auto_mapping() {
        let sql = copy_songs(&config()).sql;
        assert!(sql.starts_with("COPY stage_songs\nFROM 's3://udacity-dend/song_data'\n"));
        assert!(sql.contains("FORMAT AS JSON 'auto'"));
        assert!(!sql.contains("TIMEFORMAT"));
    }

    #[test]
    fn literals_escape_single_quotes() {
        assert_eq!(quote_literal("s3://b/it's"), "'s3://b/it''s'");
    }

    #[tokio::test]
    async fn load_copies_events_then_songs_committing_each() {
        let mut wh = RecordingWarehouse::new(CommitMode::PerStatement);
        let log = wh.log();
        load_staging(&mut wh, &config()).await.unwrap();

        assert_eq!(executed(&log), ["copy_stage_events", "copy_stage_songs"]);
        let events = log.lock().unwrap();
        assert_eq!(events.iter().filter(|e| **e == Event::Commit).count(), 2);
    }

    #[tokio::test]
    async fn failed_copy_is_not_retried() {
        let mut wh = RecordingWarehouse::new(CommitMode::PerStatement).failing_on("copy_stage_events");
        let log = wh.log();
        let err = load_staging(&mut wh, &config()).await.unwrap_err();

        assert_eq!(err.statement_name(), Some("copy_stage_events"));
        assert!(executed(&log).is_empty());
    }
}
