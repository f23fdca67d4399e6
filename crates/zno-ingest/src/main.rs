//! ZNO Ingest - load open-data exports and report regional averages

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use zno_common::logging::{init_logging, LogConfig, LogLevel};
use zno_ingest::config::Config;
use zno_ingest::pipeline;

#[derive(Parser, Debug)]
#[command(name = "zno-ingest")]
#[command(author, version, about = "Load ZNO results into PostgreSQL and report average marks by region")]
struct Cli {
    #[command(flatten)]
    config: Config,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over flags
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("zno-ingest")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    cli.config.validate()?;

    match pipeline::run(&cli.config).await {
        Ok(outcome) => {
            info!(
                rows = outcome.rows,
                inserted = outcome.load.rows_inserted,
                report = %outcome.report_path.display(),
                "Ingestion complete"
            );
            Ok(())
        },
        Err(err) => {
            error!(error = %err, "Ingestion failed");
            Err(err.into())
        },
    }
}
