//! PostgreSQL implementation of the storage seam
//!
//! Every [`PgConnector::connect`] opens one dedicated `PgConnection`; the
//! pipeline is sequential and never needs a pool.

use crate::config::DatabaseConfig;
use crate::error::{IngestError, Result};
use crate::report::{average_query, RegionAverage, Subject};
use crate::schema::{Identifier, TableSchema};
use crate::store::{Connector, Progress, Store, PROGRESS_TABLE_SUFFIX};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, Postgres, QueryBuilder};
use tracing::{debug, info};
use zno_common::types::{Row, Value};
use zno_common::ZnoError;

/// Postgres accepts at most this many bind parameters per statement
const MAX_BIND_PARAMS: usize = 65_535;

/// SQLSTATE for a missing relation
const UNDEFINED_TABLE: &str = "42P01";

fn to_int(value: u64) -> Result<i32> {
    i32::try_from(value).map_err(|_| {
        IngestError::Data(ZnoError::schema(format!(
            "row count {} does not fit the INT progress columns",
            value
        )))
    })
}

fn from_int(value: i32, column: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| {
        IngestError::Data(ZnoError::schema(format!(
            "progress column {} holds negative value {}",
            column, value
        )))
    })
}

/// Opens connections from fixed connection parameters
#[derive(Debug, Clone)]
pub struct PgConnector {
    options: PgConnectOptions,
}

impl PgConnector {
    pub fn new(config: &DatabaseConfig) -> Self {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.name)
            .username(&config.user)
            .password(&config.password);
        Self { options }
    }

    pub fn from_options(options: PgConnectOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Connector for PgConnector {
    type Store = PgStore;

    async fn connect(&self) -> Result<PgStore> {
        let conn = PgConnection::connect_with(&self.options)
            .await
            .map_err(IngestError::connect_failed)?;
        info!("Database connection successful");
        Ok(PgStore { conn })
    }
}

/// One live connection
pub struct PgStore {
    conn: PgConnection,
}

impl PgStore {
    /// Close the connection gracefully
    pub async fn close(self) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }
}

fn push_row_values<'args>(
    builder: &mut QueryBuilder<'args, Postgres>,
    rows: &'args [Row],
) {
    builder.push_values(rows, |mut b, row| {
        for value in row {
            match value {
                Value::Text(text) => {
                    b.push_bind(text.as_deref());
                },
                Value::Integer(int) => {
                    b.push_bind(*int);
                },
                Value::Fractional(float) => {
                    b.push_bind(*float);
                },
            }
        }
    });
}

#[async_trait]
impl Store for PgStore {
    async fn provision(&mut self, table: &Identifier, schema: &TableSchema, total_rows: u64) -> Result<()> {
        let logs = table.with_suffix(PROGRESS_TABLE_SUFFIX)?;
        let total_rows = to_int(total_rows)?;

        let mut tx = self.conn.begin().await?;

        sqlx::query(&schema.create_table_sql(table))
            .execute(&mut *tx)
            .await?;

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (rows_added INT, rows_left INT)",
            logs
        ))
        .execute(&mut *tx)
        .await?;

        let seeded = sqlx::query(&format!(
            "INSERT INTO {logs} (rows_added, rows_left) SELECT 0, $1 \
             WHERE NOT EXISTS (SELECT 1 FROM {logs})",
            logs = logs
        ))
        .bind(total_rows)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        debug!(table = %table, seeded = seeded > 0, "Provisioned destination table");
        Ok(())
    }

    async fn read_progress(&mut self, table: &Identifier) -> Result<Option<Progress>> {
        let logs = table.with_suffix(PROGRESS_TABLE_SUFFIX)?;

        let row: Option<(i32, i32)> =
            match sqlx::query_as(&format!("SELECT rows_added, rows_left FROM {} LIMIT 1", logs))
                .fetch_optional(&mut self.conn)
                .await
            {
                Ok(row) => row,
                Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some(UNDEFINED_TABLE) => {
                    return Ok(None);
                },
                Err(err) => return Err(err.into()),
            };

        row.map(|(added, left)| {
            Ok(Progress {
                rows_added: from_int(added, "rows_added")?,
                rows_left: from_int(left, "rows_left")?,
            })
        })
        .transpose()
    }

    async fn commit_batch(
        &mut self,
        table: &Identifier,
        schema: &TableSchema,
        rows: &[Row],
        next: Progress,
    ) -> Result<()> {
        let logs = table.with_suffix(PROGRESS_TABLE_SUFFIX)?;
        let rows_per_statement = (MAX_BIND_PARAMS / schema.len().max(1)).max(1);
        let insert_prefix = format!("INSERT INTO {} ({}) ", table, schema.column_list());

        let mut tx = self.conn.begin().await?;

        for chunk in rows.chunks(rows_per_statement) {
            let mut builder = QueryBuilder::<Postgres>::new(&insert_prefix);
            push_row_values(&mut builder, chunk);
            builder.build().execute(&mut *tx).await?;
        }

        sqlx::query(&format!(
            "UPDATE {} SET rows_added = $1, rows_left = $2",
            logs
        ))
        .bind(to_int(next.rows_added)?)
        .bind(to_int(next.rows_left)?)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn average_by_region(
        &mut self,
        table: &Identifier,
        subject: &Subject,
        status: &str,
    ) -> Result<Vec<RegionAverage>> {
        let rows: Vec<(Option<String>, Option<i32>, Option<f64>)> =
            sqlx::query_as(&average_query(table, subject))
                .bind(status)
                .fetch_all(&mut self.conn)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(regname, year, avg_mark)| RegionAverage {
                regname,
                year,
                avg_mark,
            })
            .collect())
    }
}
