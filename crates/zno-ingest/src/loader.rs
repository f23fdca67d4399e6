//! Resumable batch loader
//!
//! Rows move into the destination table in batches of `batch_size`. Each
//! batch commits together with the updated progress record, so the progress
//! row always describes exactly the committed rows. After a lost connection
//! the loader reconnects, re-reads progress and continues from there, which
//! also makes a restarted process pick up where the last one stopped.

use crate::error::{IngestError, Result};
use crate::progress::DecileTracker;
use crate::retry::{connect_with_retry, RetryPolicy};
use crate::schema::{Identifier, TableSchema};
use crate::store::{Connector, Store};
use tracing::{debug, info, instrument};
use zno_common::types::Frame;

/// Rows per transaction unless configured otherwise
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Outcome of one [`Loader::load`] run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Rows committed by this run
    pub rows_inserted: u64,
    /// Batches committed by this run
    pub batches: u64,
    /// `rows_added` found when the run first read progress
    pub resumed_from: Option<u64>,
    /// Times the run started over on a fresh connection
    pub restarts: u32,
    /// Decile thresholds reported by this run
    pub milestones: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Loader {
    batch_size: usize,
    policy: RetryPolicy,
}

impl Loader {
    /// `batch_size` of zero is treated as one
    pub fn new(batch_size: usize, policy: RetryPolicy) -> Self {
        Self {
            batch_size: batch_size.max(1),
            policy,
        }
    }

    /// Load `frame` into `table`, reconnecting on connection loss
    #[instrument(skip_all, fields(table = %table, rows = frame.len()))]
    pub async fn load<C: Connector>(
        &self,
        connector: &C,
        table: &Identifier,
        schema: &TableSchema,
        frame: &Frame,
    ) -> Result<LoadSummary> {
        let mut tracker = DecileTracker::new(frame.len() as u64);
        let mut summary = LoadSummary::default();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let batches_before = summary.batches;
            let result = match connect_with_retry(connector, &self.policy).await {
                Ok(mut store) => {
                    self.load_once(&mut store, table, schema, frame, &mut tracker, &mut summary)
                        .await
                },
                Err(err) => Err(err),
            };

            match result {
                Ok(()) => break,
                Err(err) => {
                    // A pass that committed something starts a fresh streak
                    if summary.batches > batches_before {
                        attempt = 1;
                    }
                    self.policy.backoff("load", attempt, err).await?;
                    summary.restarts += 1;
                },
            }
        }

        info!(
            rows_inserted = summary.rows_inserted,
            batches = summary.batches,
            restarts = summary.restarts,
            "All data successfully inserted"
        );
        Ok(summary)
    }

    /// One pass over a single connection; returns on completion or first error
    pub async fn load_once<S: Store + ?Sized>(
        &self,
        store: &mut S,
        table: &Identifier,
        schema: &TableSchema,
        frame: &Frame,
        tracker: &mut DecileTracker,
        summary: &mut LoadSummary,
    ) -> Result<()> {
        let mut progress = store
            .read_progress(table)
            .await?
            .ok_or_else(|| IngestError::MissingProgress(table.to_string()))?;

        let total = frame.len() as u64;
        if progress.total() != total {
            return Err(IngestError::ProgressMismatch {
                table: table.to_string(),
                recorded: progress.total(),
                actual: total,
            });
        }

        if summary.resumed_from.is_none() {
            summary.resumed_from = Some(progress.rows_added);
            if progress.rows_added > 0 {
                info!(rows_added = progress.rows_added, rows_left = progress.rows_left, "Resuming load");
            }
        }
        tracker.skip_committed(progress.rows_added);

        while !progress.is_complete() {
            let batch = progress.rows_left.min(self.batch_size as u64);
            let offset = usize::try_from(progress.rows_added)
                .map_err(|_| IngestError::config("progress offset exceeds addressable rows"))?;
            let rows = frame.slice(offset, batch as usize);
            let next = progress.advance(batch);

            store.commit_batch(table, schema, rows, next).await?;
            debug!(rows_added = next.rows_added, rows_left = next.rows_left, "Committed batch");

            summary.rows_inserted += batch;
            summary.batches += 1;
            for percent in tracker.advance(next.rows_added) {
                info!(percent, "{}% of data committed into \"{}\"", percent, table);
                summary.milestones.push(percent);
            }

            progress = next;
        }

        Ok(())
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE, RetryPolicy::default())
    }
}
