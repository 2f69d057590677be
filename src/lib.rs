pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod schema;
pub mod stage;
pub mod transform;
pub mod warehouse;

pub use config::Config;
pub use error::{ConfigError, EtlError, Result};
pub use pipeline::{reset_schema, run_etl, RunSummary};
