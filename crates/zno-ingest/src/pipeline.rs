//! End-to-end run: read, provision, load, report, record elapsed time

use crate::config::Config;
use crate::db::PgConnector;
use crate::error::Result;
use crate::loader::{LoadSummary, Loader};
use crate::provision::provision;
use crate::report::compare_regions;
use crate::schema::TableSchema;
use crate::source::read_sources;
use crate::store::Connector;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub rows: usize,
    pub load: LoadSummary,
    pub report_path: PathBuf,
    pub elapsed: Duration,
}

/// Run against the PostgreSQL database described by `config`
pub async fn run(config: &Config) -> Result<PipelineOutcome> {
    let connector = PgConnector::new(&config.database);
    run_with(config, &connector).await
}

/// Run against any destination
pub async fn run_with<C: Connector>(config: &Config, connector: &C) -> Result<PipelineOutcome> {
    let started = Instant::now();
    let table = config.table_name()?;
    let subject = config.subject()?;
    let policy = config.retry_policy();

    let frame = read_sources(&config.sources())?;
    let schema = TableSchema::infer(&frame)?;

    provision(connector, &policy, &table, &schema, frame.len() as u64).await?;

    let load = Loader::new(config.batch_size, policy.clone())
        .load(connector, &table, &schema, &frame)
        .await?;

    std::fs::create_dir_all(&config.output_dir)?;
    let report_path = compare_regions(
        connector,
        &policy,
        &table,
        &subject,
        &config.status,
        &config.output_dir,
    )
    .await?;

    let elapsed = started.elapsed();
    export_time(&config.processing_time_path(), elapsed)?;

    info!(
        rows = frame.len(),
        elapsed_secs = elapsed.as_secs_f64(),
        "Pipeline finished"
    );

    Ok(PipelineOutcome {
        rows: frame.len(),
        load,
        report_path,
        elapsed,
    })
}

/// Elapsed seconds rounded to milliseconds, expressed in minutes
pub fn elapsed_minutes(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0).round() / 1000.0 / 60.0
}

/// Write `"<minutes> minutes"` to `path`
pub fn export_time(path: &Path, elapsed: Duration) -> Result<()> {
    std::fs::write(path, format!("{} minutes", elapsed_minutes(elapsed)))?;
    Ok(())
}
