// src/schema/types.rs

use serde::Deserialize;
use std::fmt;

/// The seven tables of the star schema plus its staging area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    StageEvents,
    StageSongs,
    Songplays,
    Users,
    Songs,
    Artists,
    Time,
}

impl Table {
    pub const ALL: [Table; 7] = [
        Table::StageEvents,
        Table::StageSongs,
        Table::Songplays,
        Table::Users,
        Table::Songs,
        Table::Artists,
        Table::Time,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::StageEvents => "stage_events",
            Table::StageSongs => "stage_songs",
            Table::Songplays => "songplays",
            Table::Users => "users",
            Table::Songs => "songs",
            Table::Artists => "artists",
            Table::Time => "time",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which engine the DDL is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Identity columns, sort/dist keys and informational foreign keys.
    #[default]
    Redshift,
    /// Plain PostgreSQL: no physical hints and no foreign keys, since the
    /// fact table is filled before the dimensions it points at.
    Postgres,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Redshift => "redshift",
            Dialect::Postgres => "postgres",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column of a table definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: &'static str,
    pub not_null: bool,
    pub primary_key: bool,
    pub identity: bool,
    pub sortkey: bool,
    pub distkey: bool,
    pub references: Option<(Table, &'static str)>,
}

impl Column {
    pub const fn new(name: &'static str, ty: &'static str) -> Self {
        Self {
            name,
            ty,
            not_null: false,
            primary_key: false,
            identity: false,
            sortkey: false,
            distkey: false,
            references: None,
        }
    }

    pub const fn not_null(self) -> Self {
        Self {
            not_null: true,
            ..self
        }
    }

    /// Primary keys are always `NOT NULL`.
    pub const fn primary_key(self) -> Self {
        Self {
            primary_key: true,
            not_null: true,
            ..self
        }
    }

    pub const fn identity(self) -> Self {
        Self {
            identity: true,
            ..self
        }
    }

    pub const fn sortkey(self) -> Self {
        Self {
            sortkey: true,
            ..self
        }
    }

    pub const fn distkey(self) -> Self {
        Self {
            distkey: true,
            ..self
        }
    }

    pub const fn references(self, table: Table, column: &'static str) -> Self {
        Self {
            references: Some((table, column)),
            ..self
        }
    }

    pub fn render(&self, dialect: Dialect) -> String {
        let mut out = format!("{} {}", self.name, self.ty);
        if self.identity {
            out.push_str(match dialect {
                Dialect::Redshift => " IDENTITY(0,1)",
                Dialect::Postgres => " GENERATED BY DEFAULT AS IDENTITY",
            });
        }
        if dialect == Dialect::Redshift {
            if self.distkey {
                out.push_str(" DISTKEY");
            }
            if self.sortkey {
                out.push_str(" SORTKEY");
            }
        }
        if self.not_null {
            out.push_str(" NOT NULL");
        }
        if self.primary_key {
            out.push_str(" PRIMARY KEY");
        }
        if let (Some((table, column)), Dialect::Redshift) = (self.references, dialect) {
            out.push_str(&format!(" REFERENCES {table}({column})"));
        }
        out
    }
}

/// A full table definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub table: Table,
    pub columns: &'static [Column],
    /// Replicate the whole table to every node (small dimensions).
    pub diststyle_all: bool,
}

impl TableDef {
    pub fn create_sql(&self, dialect: Dialect) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| format!("    {}", c.render(dialect)))
            .collect::<Vec<_>>()
            .join(",\n");
        let diststyle = if self.diststyle_all && dialect == Dialect::Redshift {
            "\nDISTSTYLE ALL"
        } else {
            ""
        };
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n){};",
            self.table, columns, diststyle
        )
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {};", self.table)
    }

    /// Tables this one points at through foreign keys.
    pub fn dependencies(&self) -> Vec<Table> {
        let mut deps: Vec<Table> = self
            .columns
            .iter()
            .filter_map(|c| c.references.map(|(t, _)| t))
            .collect();
        deps.sort();
        deps.dedup();
        deps
    }

    #[cfg(test)]
    pub(crate) fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }
}
