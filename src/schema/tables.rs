// src/schema/tables.rs
//
// Column layout of the staging area and the star schema.

use super::types::{Column, Table, TableDef};

/// Drop order. `songplays` goes before the dimensions it references.
pub const DROP_ORDER: [Table; 7] = [
    Table::StageEvents,
    Table::StageSongs,
    Table::Songplays,
    Table::Users,
    Table::Songs,
    Table::Artists,
    Table::Time,
];

/// Create order. Every dimension exists before `songplays`.
pub const CREATE_ORDER: [Table; 7] = [
    Table::StageEvents,
    Table::StageSongs,
    Table::Time,
    Table::Users,
    Table::Songs,
    Table::Artists,
    Table::Songplays,
];

// Raw log events; column names follow the JSONPaths file used by COPY.
const STAGE_EVENTS: &[Column] = &[
    Column::new("artist", "varchar(500)"),
    Column::new("auth", "varchar(50)"),
    Column::new("firstName", "varchar(50)"),
    Column::new("gender", "varchar(6)"),
    Column::new("itemInSession", "int"),
    Column::new("lastName", "varchar(50)"),
    Column::new("length", "real"),
    Column::new("level", "varchar(50)"),
    Column::new("location", "varchar(500)"),
    Column::new("method", "varchar"),
    Column::new("page", "varchar"),
    Column::new("registration", "real"),
    Column::new("session_id", "smallint"),
    Column::new("song", "varchar"),
    Column::new("status", "smallint"),
    Column::new("ts", "bigint"),
    Column::new("userAgent", "varchar(500)"),
    Column::new("userId", "smallint"),
];

// Raw song catalog; loaded with `JSON 'auto'`, so names match the JSON keys.
const STAGE_SONGS: &[Column] = &[
    Column::new("num_songs", "smallint"),
    Column::new("artist_id", "varchar(50)"),
    Column::new("artist_latitude", "float"),
    Column::new("artist_longitude", "float"),
    Column::new("artist_location", "varchar"),
    Column::new("artist_name", "varchar(500)"),
    Column::new("song_id", "varchar(50)"),
    Column::new("title", "varchar"),
    Column::new("duration", "real"),
    Column::new("year", "int"),
];

const TIME: &[Column] = &[
    Column::new("start_time", "timestamp").primary_key(),
    Column::new("hour", "int"),
    Column::new("day", "int"),
    Column::new("week", "int"),
    Column::new("month", "int"),
    Column::new("year", "int"),
    Column::new("weekday", "int"),
];

const USERS: &[Column] = &[
    Column::new("user_id", "smallint")
        .primary_key()
        .sortkey()
        .distkey(),
    Column::new("first_name", "varchar(50)"),
    Column::new("last_name", "varchar(50)"),
    Column::new("gender", "varchar(6)"),
    Column::new("level", "varchar(50)"),
];

const SONGS: &[Column] = &[
    Column::new("song_id", "varchar(50)").primary_key().sortkey(),
    Column::new("title", "varchar"),
    Column::new("artist_id", "varchar(50)"),
    Column::new("year", "int"),
    Column::new("duration", "real"),
];

const ARTISTS: &[Column] = &[
    Column::new("artist_id", "varchar(500)").primary_key().sortkey(),
    Column::new("name", "varchar(500)"),
    Column::new("location", "varchar(500)"),
    Column::new("latitude", "float"),
    Column::new("longitude", "float"),
];

const SONGPLAYS: &[Column] = &[
    Column::new("songplay_id", "int")
        .identity()
        .primary_key()
        .sortkey(),
    Column::new("start_time", "timestamp")
        .not_null()
        .references(Table::Time, "start_time"),
    Column::new("user_id", "smallint")
        .not_null()
        .distkey()
        .references(Table::Users, "user_id"),
    Column::new("level", "varchar(500)"),
    Column::new("song_id", "varchar(500)")
        .not_null()
        .references(Table::Songs, "song_id"),
    Column::new("artist_id", "varchar(500)")
        .not_null()
        .references(Table::Artists, "artist_id"),
    Column::new("session_id", "smallint"),
    Column::new("location", "varchar(500)"),
    Column::new("user_agent", "varchar(500)"),
];

pub fn definition(table: Table) -> TableDef {
    let (columns, diststyle_all) = match table {
        Table::StageEvents => (STAGE_EVENTS, false),
        Table::StageSongs => (STAGE_SONGS, false),
        Table::Time => (TIME, true),
        Table::Users => (USERS, false),
        Table::Songs => (SONGS, true),
        Table::Artists => (ARTISTS, true),
        Table::Songplays => (SONGPLAYS, false),
    };
    TableDef {
        table,
        columns,
        diststyle_all,
    }
}
