//! Error types for ZNO data handling

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for data-level operations
pub type Result<T> = std::result::Result<T, ZnoError>;

/// Data-level error type: reading, decoding and shaping source tables
#[derive(Error, Debug)]
pub enum ZnoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: Box<ZnoError>,
    },

    #[error("Parse error at line {line}, column '{column}': {message}")]
    Parse {
        line: u64,
        column: String,
        message: String,
    },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ZnoError {
    /// Create a parse error for a single field
    pub fn parse(line: u64, column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a schema error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    /// Attach the offending file path to an error
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        Self::Read {
            path: path.into(),
            source: Box::new(self),
        }
    }
}
