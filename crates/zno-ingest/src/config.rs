//! Run configuration
//!
//! Every setting can come from a command-line flag or a `ZNO_*` environment
//! variable (a `.env` file is loaded first by the binary).

use crate::error::{IngestError, Result};
use crate::loader::DEFAULT_BATCH_SIZE;
use crate::report::Subject;
use crate::retry::RetryPolicy;
use crate::schema::Identifier;
use crate::source::SourceFile;
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Configuration Constants
// ============================================================================

pub const DEFAULT_DB_HOST: &str = "localhost";

pub const DEFAULT_DB_PORT: u16 = 5432;

pub const DEFAULT_DB_NAME: &str = "zno";

pub const DEFAULT_DB_USER: &str = "postgres";

pub const DEFAULT_FILE_2019: &str = "data/Odata2019File.csv";

pub const DEFAULT_FILE_2020: &str = "data/Odata2020File.csv";

pub const DEFAULT_TABLE_NAME: &str = "open_data_zno";

pub const DEFAULT_SUBJECT: &str = "eng";

/// Status of results counted in the report ("accepted")
pub const DEFAULT_STATUS: &str = "Зараховано";

pub const DEFAULT_RETRY_DELAY_SECS: u64 = 2;

/// File receiving the total processing time
pub const PROCESSING_TIME_FILE: &str = "processing_time.txt";

/// Database connection parameters
#[derive(Debug, Clone, Args)]
pub struct DatabaseConfig {
    /// Database host
    #[arg(long = "db-host", env = "ZNO_DB_HOST", default_value = DEFAULT_DB_HOST)]
    pub host: String,

    /// Database port
    #[arg(long = "db-port", env = "ZNO_DB_PORT", default_value_t = DEFAULT_DB_PORT)]
    pub port: u16,

    /// Database name
    #[arg(long = "db-name", env = "ZNO_DB_NAME", default_value = DEFAULT_DB_NAME)]
    pub name: String,

    /// Database user
    #[arg(long = "db-user", env = "ZNO_DB_USER", default_value = DEFAULT_DB_USER)]
    pub user: String,

    /// Database password
    #[arg(long = "db-password", env = "ZNO_DB_PASSWORD", default_value = "", hide_env_values = true)]
    pub password: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DB_HOST.to_string(),
            port: DEFAULT_DB_PORT,
            name: DEFAULT_DB_NAME.to_string(),
            user: DEFAULT_DB_USER.to_string(),
            password: String::new(),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Args)]
pub struct Config {
    #[command(flatten)]
    pub database: DatabaseConfig,

    /// 2019 results export
    #[arg(long = "file-2019", env = "ZNO_FILE_2019", default_value = DEFAULT_FILE_2019)]
    pub file_2019: PathBuf,

    /// 2020 results export
    #[arg(long = "file-2020", env = "ZNO_FILE_2020", default_value = DEFAULT_FILE_2020)]
    pub file_2020: PathBuf,

    /// Destination table
    #[arg(long, env = "ZNO_TABLE", default_value = DEFAULT_TABLE_NAME)]
    pub table: String,

    /// Subject prefix used by the report (eng, ukr, math, ...)
    #[arg(long, env = "ZNO_SUBJECT", default_value = DEFAULT_SUBJECT)]
    pub subject: String,

    /// Test status counted by the report
    #[arg(long, env = "ZNO_STATUS", default_value = DEFAULT_STATUS)]
    pub status: String,

    /// Rows per transaction
    #[arg(long = "batch-size", env = "ZNO_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Seconds to wait before reconnecting
    #[arg(long = "retry-delay-secs", env = "ZNO_RETRY_DELAY_SECS", default_value_t = DEFAULT_RETRY_DELAY_SECS)]
    pub retry_delay_secs: u64,

    /// Give up after this many attempts (retries forever when unset)
    #[arg(long = "max-retries", env = "ZNO_MAX_RETRIES")]
    pub max_retries: Option<u32>,

    /// Directory receiving the report and timing files
    #[arg(long = "output-dir", env = "ZNO_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            file_2019: PathBuf::from(DEFAULT_FILE_2019),
            file_2020: PathBuf::from(DEFAULT_FILE_2020),
            table: DEFAULT_TABLE_NAME.to_string(),
            subject: DEFAULT_SUBJECT.to_string(),
            status: DEFAULT_STATUS.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            max_retries: None,
            output_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    pub fn table_name(&self) -> Result<Identifier> {
        Identifier::parse(&self.table)
    }

    pub fn subject(&self) -> Result<Subject> {
        Subject::parse(&self.subject)
    }

    /// Exports in load order
    pub fn sources(&self) -> Vec<SourceFile> {
        vec![
            SourceFile::new(&self.file_2019, 2019),
            SourceFile::new(&self.file_2020, 2020),
        ]
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let delay = Duration::from_secs(self.retry_delay_secs);
        match self.max_retries {
            Some(max) => RetryPolicy::bounded(delay, max),
            None => RetryPolicy::unbounded(delay),
        }
    }

    pub fn processing_time_path(&self) -> PathBuf {
        self.output_dir.join(PROCESSING_TIME_FILE)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.database.host.trim().is_empty() {
            return Err(IngestError::config("database host cannot be empty"));
        }

        if self.database.name.trim().is_empty() {
            return Err(IngestError::config("database name cannot be empty"));
        }

        if self.batch_size == 0 {
            return Err(IngestError::config("batch size must be greater than 0"));
        }

        if self.max_retries == Some(0) {
            return Err(IngestError::config("max retries must be greater than 0 when set"));
        }

        self.table_name()?.with_suffix(crate::store::PROGRESS_TABLE_SUFFIX)?;
        self.subject()?;

        Ok(())
    }
}
