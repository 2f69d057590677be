use anyhow::{Context, Result};
use sparkify_dwh::{logging, pipeline, Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    info!("startup");

    let config = Config::from_env().context("loading warehouse config")?;
    info!(host = %config.cluster.host, db = %config.cluster.db_name, "config loaded");

    let summary = pipeline::reset_schema(&config)
        .await
        .context("resetting warehouse schema")?;

    info!(statements = summary.statements(), "tables dropped and recreated");
    Ok(())
}
