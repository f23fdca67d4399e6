//! Regional average report
//!
//! Runs the one aggregate query over the loaded table and writes
//! `avg_<subject>_by_region.csv` with columns `regname, year, avg_mark`.

use crate::error::Result;
use crate::retry::{connect_with_retry, retry, RetryPolicy};
use crate::schema::Identifier;
use crate::store::{Connector, Store};
use std::path::{Path, PathBuf};
use tracing::info;

/// Exam subject prefix such as `eng` or `ukr`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject(Identifier);

impl Subject {
    pub fn parse(name: &str) -> Result<Self> {
        Identifier::parse(name).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// 100-point score column, e.g. `engball100`
    pub fn score_column(&self) -> String {
        format!("{}ball100", self.0)
    }

    /// Pass/fail status column, e.g. `engteststatus`
    pub fn status_column(&self) -> String {
        format!("{}teststatus", self.0)
    }

    pub fn report_file_name(&self) -> String {
        format!("avg_{}_by_region.csv", self.0)
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One output row
#[derive(Debug, Clone, PartialEq)]
pub struct RegionAverage {
    pub regname: Option<String>,
    pub year: Option<i32>,
    /// Rounded to two decimals
    pub avg_mark: Option<f64>,
}

/// Aggregate query text for `subject` over `table`; the status is `$1`
pub fn average_query(table: &Identifier, subject: &Subject) -> String {
    format!(
        "SELECT regname, year, ROUND(AVG({score})::numeric, 2)::float8 AS avg_mark \
         FROM {table} WHERE {status} = $1 \
         GROUP BY regname, year ORDER BY regname, year",
        score = subject.score_column(),
        table = table,
        status = subject.status_column(),
    )
}

/// Write report rows as CSV with a header line
pub fn write_report(path: &Path, rows: &[RegionAverage]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["regname", "year", "avg_mark"])?;

    for row in rows {
        let year = row.year.map(|y| y.to_string()).unwrap_or_default();
        let avg_mark = row.avg_mark.map(|m| format!("{:.2}", m)).unwrap_or_default();
        writer.write_record([
            row.regname.as_deref().unwrap_or(""),
            year.as_str(),
            avg_mark.as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Query regional averages and save them under `output_dir`
pub async fn compare_regions<C: Connector>(
    connector: &C,
    policy: &RetryPolicy,
    table: &Identifier,
    subject: &Subject,
    status: &str,
    output_dir: &Path,
) -> Result<PathBuf> {
    let rows = retry(policy, "report", move || async move {
        let mut store = connect_with_retry(connector, policy).await?;
        store.average_by_region(table, subject, status).await
    })
    .await?;

    let path = output_dir.join(subject.report_file_name());
    write_report(&path, &rows)?;

    info!(
        path = %path.display(),
        regions = rows.len(),
        "Comparative statistics successfully saved"
    );
    Ok(path)
}
