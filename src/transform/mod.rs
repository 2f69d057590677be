//! Populates the fact and dimension tables from staging.
//!
//! Statements run in a fixed order: songplays, users, songs, artists, time.
//! `time` is derived from `songplays`, so it has to come last.

use crate::error::Result;
use crate::schema::Table;
use crate::warehouse::{Batch, BatchReport, Statement, Warehouse};
use serde::Deserialize;
use std::fmt;
use tracing::{info, instrument};

/// Value of `stage_events.page` for an actual song play.
pub const PLAY_PAGE: &str = "NextSong";

/// `stage_events.ts` (epoch milliseconds) as a timestamp.
const START_TIME: &str = "TIMESTAMP 'epoch' + e.ts / 1000 * INTERVAL '1 second'";

/// How the songplays insert avoids re-inserting plays on a re-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SongplayDedup {
    /// Skip every event of a user who already has any songplay. New plays
    /// by a known user are never loaded.
    #[default]
    User,
    /// Skip only events whose (user_id, start_time, song_id) is already
    /// present.
    Event,
}

impl SongplayDedup {
    pub fn as_str(&self) -> &'static str {
        match self {
            SongplayDedup::User => "user",
            SongplayDedup::Event => "event",
        }
    }
}

impl fmt::Display for SongplayDedup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn songplays_insert(dedup: SongplayDedup) -> Statement {
    let anti_join = match dedup {
        SongplayDedup::User => "  AND e.userId NOT IN (SELECT DISTINCT user_id FROM songplays)".to_string(),
        SongplayDedup::Event => format!(
            "  AND NOT EXISTS (\n\
             \x20     SELECT 1 FROM songplays p\n\
             \x20     WHERE p.user_id = e.userId\n\
             \x20       AND p.start_time = {START_TIME}\n\
             \x20       AND p.song_id = s.song_id\n\
             \x20 )"
        ),
    };

    let sql = format!(
        "INSERT INTO songplays (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent)\n\
         SELECT DISTINCT\n\
         \x20   {START_TIME} AS start_time,\n\
         \x20   e.userId AS user_id,\n\
         \x20   e.level,\n\
         \x20   s.song_id,\n\
         \x20   s.artist_id,\n\
         \x20   e.session_id,\n\
         \x20   e.location,\n\
         \x20   e.userAgent AS user_agent\n\
         FROM stage_events e\n\
         JOIN stage_songs s ON e.artist = s.artist_name AND e.song = s.title\n\
         WHERE e.page = '{PLAY_PAGE}'\n\
         \x20 AND e.userId IS NOT NULL\n\
         \x20 AND e.ts IS NOT NULL\n\
         \x20 AND s.song_id IS NOT NULL\n\
         \x20 AND s.artist_id IS NOT NULL\n\
         {anti_join};"
    );
    Statement::new(format!("insert_{}", Table::Songplays), sql)
}

/// One row per user, taken from that user's most recent event.
pub fn users_insert() -> Statement {
    let sql = "INSERT INTO users (user_id, first_name, last_name, gender, level)\n\
               SELECT user_id, first_name, last_name, gender, level\n\
               FROM (\n\
               \x20   SELECT\n\
               \x20       userId AS user_id,\n\
               \x20       firstName AS first_name,\n\
               \x20       lastName AS last_name,\n\
               \x20       gender,\n\
               \x20       level,\n\
               \x20       ROW_NUMBER() OVER (PARTITION BY userId ORDER BY ts DESC, itemInSession DESC) AS recency\n\
               \x20   FROM stage_events\n\
               \x20   WHERE userId IS NOT NULL\n\
               ) latest\n\
               WHERE recency = 1\n\
               \x20 AND user_id NOT IN (SELECT user_id FROM users);";
    Statement::new(format!("insert_{}", Table::Users), sql)
}

/// One row per song. Catalog rows repeating a `song_id` prefer a known year.
pub fn songs_insert() -> Statement {
    let sql = "INSERT INTO songs (song_id, title, artist_id, year, duration)\n\
               SELECT song_id, title, artist_id, year, duration\n\
               FROM (\n\
               \x20   SELECT\n\
               \x20       song_id, title, artist_id, year, duration,\n\
               \x20       ROW_NUMBER() OVER (\n\
               \x20           PARTITION BY song_id\n\
               \x20           ORDER BY CASE WHEN year > 0 THEN 0 ELSE 1 END, title, artist_id, duration\n\
               \x20       ) AS pick\n\
               \x20   FROM stage_songs\n\
               \x20   WHERE song_id IS NOT NULL\n\
               ) catalog\n\
               WHERE pick = 1\n\
               \x20 AND song_id NOT IN (SELECT song_id FROM songs);";
    Statement::new(format!("insert_{}", Table::Songs), sql)
}

/// One row per artist. The catalog repeats an artist on every song with
/// whatever location it had at the time; rows carrying a location and
/// coordinates win.
pub fn artists_insert() -> Statement {
    let sql = "INSERT INTO artists (artist_id, name, location, latitude, longitude)\n\
               SELECT artist_id, name, location, latitude, longitude\n\
               FROM (\n\
               \x20   SELECT\n\
               \x20       artist_id,\n\
               \x20       artist_name AS name,\n\
               \x20       artist_location AS location,\n\
               \x20       artist_latitude AS latitude,\n\
               \x20       artist_longitude AS longitude,\n\
               \x20       ROW_NUMBER() OVER (\n\
               \x20           PARTITION BY artist_id\n\
               \x20           ORDER BY\n\
               \x20               CASE WHEN artist_location IS NULL OR artist_location = '' THEN 1 ELSE 0 END,\n\
               \x20               CASE WHEN artist_latitude IS NULL THEN 1 ELSE 0 END,\n\
               \x20               artist_name, artist_location\n\
               \x20       ) AS pick\n\
               \x20   FROM stage_songs\n\
               \x20   WHERE artist_id IS NOT NULL\n\
               ) catalog\n\
               WHERE pick = 1\n\
               \x20 AND artist_id NOT IN (SELECT artist_id FROM artists);";
    Statement::new(format!("insert_{}", Table::Artists), sql)
}

/// Calendar breakdown of every new `songplays.start_time`. `weekday` is
/// 0 for Sunday.
pub fn time_insert() -> Statement {
    let sql = "INSERT INTO time (start_time, hour, day, week, month, year, weekday)\n\
               SELECT DISTINCT\n\
               \x20   start_time,\n\
               \x20   EXTRACT(HOUR FROM start_time) AS hour,\n\
               \x20   EXTRACT(DAY FROM start_time) AS day,\n\
               \x20   EXTRACT(WEEK FROM start_time) AS week,\n\
               \x20   EXTRACT(MONTH FROM start_time) AS month,\n\
               \x20   EXTRACT(YEAR FROM start_time) AS year,\n\
               \x20   EXTRACT(DOW FROM start_time) AS weekday\n\
               FROM songplays\n\
               WHERE start_time IS NOT NULL\n\
               \x20 AND start_time NOT IN (SELECT start_time FROM time);";
    Statement::new(format!("insert_{}", Table::Time), sql)
}

pub fn insert_batch(dedup: SongplayDedup) -> Batch {
    Batch::new(
        "insert_tables",
        vec![
            songplays_insert(dedup),
            users_insert(),
            songs_insert(),
            artists_insert(),
            time_insert(),
        ],
    )
}

#[instrument(skip_all, fields(dedup = %dedup))]
pub async fn run_inserts<W: Warehouse>(warehouse: &mut W, dedup: SongplayDedup) -> Result<BatchReport> {
    let report = warehouse.run(&insert_batch(dedup)).await?;
    for o in &report.outcomes {
        info!(statement = %o.name, rows = o.rows_affected, "inserted");
    }
    Ok(report)
}
