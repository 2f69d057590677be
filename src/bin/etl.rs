use anyhow::{Context, Result};
use sparkify_dwh::{logging, pipeline, Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    info!("startup");

    let config = Config::from_env().context("loading warehouse config")?;
    info!(
        host = %config.cluster.host,
        log_data = %config.storage.log_data,
        song_data = %config.storage.song_data,
        "config loaded"
    );

    let summary = pipeline::run_etl(&config)
        .await
        .context("loading staging and populating star schema")?;

    for report in &summary.reports {
        info!(
            batch = report.batch,
            rows = report.total_rows(),
            elapsed = ?report.elapsed(),
            "batch done"
        );
    }
    info!("all done");
    Ok(())
}
