// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Problems reading or validating the warehouse configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file `{}` not found", .path.display())]
    NotFound { path: PathBuf },

    #[error("could not read config file `{}`", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config file `{}`", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("config does not match the expected sections and values")]
    Layout {
        #[source]
        source: serde_yaml::Error,
    },

    #[error("missing required config key `{section}.{key}`")]
    MissingKey { section: String, key: String },

    #[error("invalid value for `{section}.{key}`: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        reason: String,
    },

    #[error("environment interpolation failed: {}", .errors.join("; "))]
    Interpolation { errors: Vec<String> },
}

/// Everything that can abort a schema reset or a load run.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot connect to warehouse at {host}:{port}")]
    Connection {
        host: String,
        port: u16,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to close warehouse connection")]
    Close(#[source] sqlx::Error),

    #[error("statement `{name}` failed")]
    Statement {
        name: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("transaction for batch `{batch}` failed")]
    Transaction {
        batch: String,
        #[source]
        source: sqlx::Error,
    },
}

impl EtlError {
    /// Name of the statement that failed, if this is a statement failure.
    pub fn statement_name(&self) -> Option<&str> {
        match self {
            EtlError::Statement { name, .. } => Some(name),
            _ => None,
        }
    }
}

pub type Result<T, E = EtlError> = std::result::Result<T, E>;
