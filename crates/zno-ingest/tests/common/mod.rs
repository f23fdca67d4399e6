//! Shared fixtures for zno-ingest integration tests
//!
//! [`MemoryDb`] is an in-process stand-in for PostgreSQL that implements the
//! same [`Store`]/[`Connector`] seam. Batches apply atomically, and connects,
//! commits or aggregate queries can be made to fail with a connection-class
//! error to exercise the reconnect path.

#![allow(dead_code)]

use async_trait::async_trait;
use encoding_rs::WINDOWS_1251;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use zno_common::types::{Column, Frame, Row, Value, ValueKind};
use zno_ingest::report::{RegionAverage, Subject};
use zno_ingest::schema::{Identifier, TableSchema};
use zno_ingest::store::{Connector, Progress, Store};
use zno_ingest::{IngestError, Result};

/// Header of the fixture exports
pub const HEADER: &str = "OUTID;Birth;SEXTYPENAME;REGNAME;UkrAdaptScale;engTestStatus;engBall100";

pub const ACCEPTED: &str = "Зараховано";

pub fn init_test_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,zno_ingest=debug,sqlx=warn,testcontainers=info")),
        )
        .with_test_writer()
        .try_init();
}

pub fn table(name: &str) -> Identifier {
    Identifier::parse(name).unwrap()
}

#[derive(Debug, Default)]
pub struct MemoryTable {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

#[derive(Debug, Default)]
pub struct MemoryState {
    pub tables: HashMap<String, MemoryTable>,
    pub progress: HashMap<String, Progress>,
    /// Progress written by every successful commit, in order
    pub commits: Vec<Progress>,
    pub connects: u32,
    pub provisions: u32,
    /// Upcoming connects to refuse
    fail_connects: u32,
    /// 1-based commit attempts to fail
    fail_commits: HashSet<usize>,
    commit_attempts: usize,
    /// Upcoming aggregate queries to drop
    fail_reports: u32,
    pub report_queries: u32,
}

/// Shared in-memory database
#[derive(Debug, Clone, Default)]
pub struct MemoryDb {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap()
    }

    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector { db: self.clone() }
    }

    /// Refuse the next `count` connection attempts
    pub fn fail_next_connects(&self, count: u32) {
        self.state().fail_connects = count;
    }

    /// Drop the connection during the `attempt`-th commit (1-based, counted
    /// across the lifetime of this database)
    pub fn fail_commit(&self, attempt: usize) {
        self.state().fail_commits.insert(attempt);
    }

    /// Drop the connection during the next `count` aggregate queries
    pub fn fail_next_reports(&self, count: u32) {
        self.state().fail_reports = count;
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.state().tables.get(table).map(|t| t.rows.clone()).unwrap_or_default()
    }

    pub fn progress(&self, table: &str) -> Option<Progress> {
        self.state().progress.get(table).copied()
    }

    pub fn commits(&self) -> Vec<Progress> {
        self.state().commits.clone()
    }

    pub fn connects(&self) -> u32 {
        self.state().connects
    }

    /// Overwrite the progress row, as an operator fixing state by hand would
    pub fn set_progress(&self, table: &str, progress: Progress) {
        self.state().progress.insert(table.to_string(), progress);
    }
}

pub struct MemoryConnector {
    db: MemoryDb,
}

#[async_trait]
impl Connector for MemoryConnector {
    type Store = MemoryStore;

    async fn connect(&self) -> Result<MemoryStore> {
        let mut state = self.db.state();
        state.connects += 1;
        if state.fail_connects > 0 {
            state.fail_connects -= 1;
            return Err(IngestError::ConnectionLost("connection refused".to_string()));
        }
        Ok(MemoryStore { db: self.db.clone() })
    }
}

pub struct MemoryStore {
    db: MemoryDb,
}

fn position(columns: &[String], name: &str) -> Result<usize> {
    columns
        .iter()
        .position(|c| c == name)
        .ok_or_else(|| IngestError::config(format!("column {} does not exist", name)))
}

#[async_trait]
impl Store for MemoryStore {
    async fn provision(&mut self, table: &Identifier, schema: &TableSchema, total_rows: u64) -> Result<()> {
        let mut state = self.db.state();
        state.provisions += 1;
        state
            .tables
            .entry(table.to_string())
            .or_insert_with(|| MemoryTable {
                columns: schema.columns().iter().map(|c| c.name.to_string()).collect(),
                rows: Vec::new(),
            });
        state
            .progress
            .entry(table.to_string())
            .or_insert_with(|| Progress::start(total_rows));
        Ok(())
    }

    async fn read_progress(&mut self, table: &Identifier) -> Result<Option<Progress>> {
        Ok(self.db.state().progress.get(table.as_str()).copied())
    }

    async fn commit_batch(
        &mut self,
        table: &Identifier,
        _schema: &TableSchema,
        rows: &[Row],
        next: Progress,
    ) -> Result<()> {
        let mut state = self.db.state();
        state.commit_attempts += 1;
        let attempt = state.commit_attempts;
        if state.fail_commits.remove(&attempt) {
            return Err(IngestError::ConnectionLost("server closed the connection unexpectedly".to_string()));
        }

        let target = state
            .tables
            .get_mut(table.as_str())
            .ok_or_else(|| IngestError::config(format!("relation {} does not exist", table)))?;
        target.rows.extend_from_slice(rows);
        state.progress.insert(table.to_string(), next);
        state.commits.push(next);
        Ok(())
    }

    async fn average_by_region(
        &mut self,
        table: &Identifier,
        subject: &Subject,
        status: &str,
    ) -> Result<Vec<RegionAverage>> {
        let mut state = self.db.state();
        state.report_queries += 1;
        if state.fail_reports > 0 {
            state.fail_reports -= 1;
            return Err(IngestError::ConnectionLost("terminating connection due to administrator command".to_string()));
        }

        let target = state
            .tables
            .get(table.as_str())
            .ok_or_else(|| IngestError::config(format!("relation {} does not exist", table)))?;

        let region_idx = position(&target.columns, "regname")?;
        let year_idx = position(&target.columns, "year")?;
        let score_idx = position(&target.columns, &subject.score_column())?;
        let status_idx = position(&target.columns, &subject.status_column())?;

        let mut groups: BTreeMap<(Option<String>, Option<i32>), (f64, u32)> = BTreeMap::new();
        for row in &target.rows {
            if row[status_idx] != Value::text(status) {
                continue;
            }
            let region = match &row[region_idx] {
                Value::Text(text) => text.clone(),
                _ => None,
            };
            let year = match row[year_idx] {
                Value::Integer(value) => value.map(|y| y as i32),
                _ => None,
            };
            let entry = groups.entry((region, year)).or_insert((0.0, 0));
            if let Value::Fractional(Some(mark)) = row[score_idx] {
                entry.0 += mark;
                entry.1 += 1;
            }
        }

        Ok(groups
            .into_iter()
            .map(|((regname, year), (sum, count))| RegionAverage {
                regname,
                year,
                avg_mark: (count > 0).then(|| (sum / f64::from(count) * 100.0).round() / 100.0),
            })
            .collect())
    }
}

/// Columns of [`result_frame`], already in loaded order
pub fn result_columns() -> Vec<Column> {
    vec![
        Column::new("outid", ValueKind::Text),
        Column::new("birth", ValueKind::Integer),
        Column::new("sextypename", ValueKind::Text),
        Column::new("year", ValueKind::Integer),
        Column::new("regname", ValueKind::Text),
        Column::new("ukradaptscale", ValueKind::Integer),
        Column::new("engteststatus", ValueKind::Text),
        Column::new("engball100", ValueKind::Fractional),
    ]
}

/// `rows` synthetic accepted results with ids `id-0`, `id-1`, ...
pub fn result_frame(rows: usize) -> Frame {
    let mut frame = Frame::new(result_columns());
    for i in 0..rows {
        frame
            .push_row(vec![
                Value::text(format!("id-{}", i)),
                Value::Integer(Some(2002)),
                Value::text("жіноча"),
                Value::Integer(Some(2019)),
                Value::text(if i % 2 == 0 { "Київ" } else { "Львівська область" }),
                Value::Integer(Some(0)),
                Value::text(ACCEPTED),
                Value::Fractional(Some(100.0 + i as f64)),
            ])
            .unwrap();
    }
    frame
}

pub fn outids(rows: &[Row]) -> Vec<String> {
    rows.iter()
        .map(|row| match &row[0] {
            Value::Text(Some(id)) => id.clone(),
            other => panic!("unexpected outid {:?}", other),
        })
        .collect()
}

/// Write `lines` under [`HEADER`] as a Windows-1251 export
pub fn write_export(path: &Path, lines: &[&str]) {
    let mut text = String::from(HEADER);
    text.push('\n');
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    let (bytes, _, had_errors) = WINDOWS_1251.encode(&text);
    assert!(!had_errors, "fixture is not representable in cp1251");
    std::fs::write(path, bytes).unwrap();
}
