//! Error types for the ingestion pipeline

use thiserror::Error;
use zno_common::ZnoError;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Pipeline error
///
/// Only [`IngestError::ConnectionLost`] is retried; every other variant is
/// fatal for the run.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Source data could not be read or shaped
    #[error(transparent)]
    Data(#[from] ZnoError),

    /// The database connection dropped or could not be established
    #[error("Database connection error: {0}")]
    ConnectionLost(String),

    /// Query failed for a reason other than connectivity
    #[error("Database query failed: {0}")]
    Database(sqlx::Error),

    /// The load was started before the table was provisioned
    #[error("No progress record for table '{0}'. Provision the table before loading.")]
    MissingProgress(String),

    /// Persisted progress does not describe the dataset being loaded
    #[error("Progress for '{table}' covers {recorded} rows but the dataset has {actual}")]
    ProgressMismatch {
        table: String,
        recorded: u64,
        actual: u64,
    },

    #[error("Invalid SQL identifier '{0}': use lowercase letters, digits and underscores, at most 63 bytes")]
    InvalidIdentifier(String),

    #[error("Giving up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<IngestError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl IngestError {
    /// Whether retrying on a fresh connection may succeed
    pub fn is_connection_error(&self) -> bool {
        matches!(self, IngestError::ConnectionLost(_))
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Any failure to open a connection is retryable, including rejections
    /// such as too many clients or a database still starting up
    pub fn connect_failed(err: sqlx::Error) -> Self {
        Self::ConnectionLost(err.to_string())
    }
}

impl From<sqlx::Error> for IngestError {
    fn from(err: sqlx::Error) -> Self {
        if is_connection_class(&err) {
            IngestError::ConnectionLost(err.to_string())
        } else {
            IngestError::Database(err)
        }
    }
}

/// SQLSTATE class 08 (connection exception), class 53 (insufficient
/// resources) and the 57P0x shutdown codes
fn is_connection_sqlstate(code: &str) -> bool {
    code.starts_with("08") || code.starts_with("53") || matches!(code, "57P01" | "57P02" | "57P03")
}

fn is_connection_class(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => db.code().is_some_and(|code| is_connection_sqlstate(&code)),
        _ => false,
    }
}
