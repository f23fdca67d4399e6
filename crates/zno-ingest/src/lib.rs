//! ZNO Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Loads the 2019 and 2020 ZNO open-data exports into PostgreSQL and builds a
//! regional average report.
//!
//! # Pipeline
//!
//! 1. [`source`] reads both CSV exports into one [`zno_common::types::Frame`]
//! 2. [`schema`] maps column kinds to SQL types
//! 3. [`provision`] creates the table and its `<table>_logs` progress row
//! 4. [`loader`] inserts rows in batches, committing progress with each batch
//! 5. [`report`] writes `avg_<subject>_by_region.csv`
//!
//! Connection failures anywhere in steps 3-5 are retried on a fresh
//! connection after a fixed delay ([`retry`]).
//!
//! # Example
//!
//! ```no_run
//! use zno_ingest::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!     let outcome = zno_ingest::pipeline::run(&config).await?;
//!     println!("loaded {} rows", outcome.rows);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod progress;
pub mod provision;
pub mod report;
pub mod retry;
pub mod schema;
pub mod source;
pub mod store;

pub use error::{IngestError, Result};
