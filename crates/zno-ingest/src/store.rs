//! Storage seam between the pipeline and the database
//!
//! [`Store`] is everything the pipeline asks of a destination database;
//! [`Connector`] hands out fresh connections. The PostgreSQL implementation
//! lives in [`crate::db`].

use crate::error::Result;
use crate::report::{RegionAverage, Subject};
use crate::schema::{Identifier, TableSchema};
use async_trait::async_trait;
use zno_common::types::Row;

/// Suffix of the companion progress table
pub const PROGRESS_TABLE_SUFFIX: &str = "_logs";

/// Persisted load progress of one destination table
///
/// After provisioning `rows_added + rows_left` equals the dataset size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub rows_added: u64,
    pub rows_left: u64,
}

impl Progress {
    /// Progress of a table nothing has been loaded into yet
    pub fn start(total_rows: u64) -> Self {
        Self {
            rows_added: 0,
            rows_left: total_rows,
        }
    }

    pub fn total(&self) -> u64 {
        self.rows_added + self.rows_left
    }

    pub fn is_complete(&self) -> bool {
        self.rows_left == 0
    }

    /// Progress after committing `rows` more rows
    pub fn advance(self, rows: u64) -> Self {
        let rows = rows.min(self.rows_left);
        Self {
            rows_added: self.rows_added + rows,
            rows_left: self.rows_left - rows,
        }
    }
}

/// One open connection to the destination database
#[async_trait]
pub trait Store: Send {
    /// Create `table` and its progress table if absent and seed progress with
    /// `(0, total_rows)` unless a progress row already exists. One transaction.
    async fn provision(&mut self, table: &Identifier, schema: &TableSchema, total_rows: u64) -> Result<()>;

    /// The progress row of `table`, if provisioned
    async fn read_progress(&mut self, table: &Identifier) -> Result<Option<Progress>>;

    /// Insert `rows` and set progress to `next` in a single transaction
    async fn commit_batch(
        &mut self,
        table: &Identifier,
        schema: &TableSchema,
        rows: &[Row],
        next: Progress,
    ) -> Result<()>;

    /// Average `<subject>ball100` per region and year over rows whose
    /// `<subject>teststatus` equals `status`, ordered by region then year
    async fn average_by_region(
        &mut self,
        table: &Identifier,
        subject: &Subject,
        status: &str,
    ) -> Result<Vec<RegionAverage>>;
}

/// Source of fresh [`Store`] connections
#[async_trait]
pub trait Connector: Send + Sync {
    type Store: Store;

    async fn connect(&self) -> Result<Self::Store>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_sequence() {
        let progress = Progress::start(25);
        let first = progress.advance(10);
        let second = first.advance(10);
        let third = second.advance(5);

        assert_eq!((first.rows_added, first.rows_left), (10, 15));
        assert_eq!((second.rows_added, second.rows_left), (20, 5));
        assert_eq!((third.rows_added, third.rows_left), (25, 0));
        assert!(third.is_complete());
        assert_eq!(third.total(), 25);
    }

    #[test]
    fn test_advance_never_overshoots() {
        let progress = Progress::start(3).advance(10);
        assert_eq!(progress, Progress { rows_added: 3, rows_left: 0 });
    }
}
