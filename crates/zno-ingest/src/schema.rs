//! Destination schema inference and SQL identifiers
//!
//! Column types come from a fixed lookup over [`ValueKind`]:
//!
//! | value kind   | SQL type           |
//! |--------------|--------------------|
//! | `Text`       | `TEXT`             |
//! | `Integer`    | `INT`              |
//! | `Fractional` | `DOUBLE PRECISION` |
//!
//! Names spliced into SQL (tables, columns, subjects) must be
//! [`Identifier`]s.

use crate::error::{IngestError, Result};
use zno_common::types::{Frame, ValueKind};

/// Postgres truncates identifiers longer than this
const MAX_IDENTIFIER_LEN: usize = 63;

/// A lowercase SQL identifier that is safe to embed unquoted
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn parse(name: &str) -> Result<Self> {
        let mut chars = name.chars();
        let valid_start = chars
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
        let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

        if valid_start && valid_rest && name.len() <= MAX_IDENTIFIER_LEN {
            Ok(Self(name.to_string()))
        } else {
            Err(IngestError::InvalidIdentifier(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<name><suffix>`, validated again so the result respects the length limit
    pub fn with_suffix(&self, suffix: &str) -> Result<Self> {
        Self::parse(&format!("{}{}", self.0, suffix))
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Destination column type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    DoublePrecision,
}

impl SqlType {
    pub fn as_sql(self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INT",
            SqlType::DoublePrecision => "DOUBLE PRECISION",
        }
    }
}

impl From<ValueKind> for SqlType {
    fn from(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Text => SqlType::Text,
            ValueKind::Integer => SqlType::Integer,
            ValueKind::Fractional => SqlType::DoublePrecision,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: Identifier,
    pub sql_type: SqlType,
}

/// Ordered column-name to SQL-type mapping for the destination table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    columns: Vec<ColumnDef>,
}

impl TableSchema {
    /// Derive the mapping from the frame's column kinds
    pub fn infer(frame: &Frame) -> Result<Self> {
        if frame.columns().is_empty() {
            return Err(IngestError::Data(zno_common::ZnoError::schema(
                "cannot infer a table schema from a frame without columns",
            )));
        }

        let columns = frame
            .columns()
            .iter()
            .map(|column| {
                Ok(ColumnDef {
                    name: Identifier::parse(&column.name)?,
                    sql_type: column.kind.into(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// `a, b, c` for INSERT column lists
    pub fn column_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn create_table_sql(&self, table: &Identifier) -> String {
        let definitions = self
            .columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.sql_type.as_sql()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE IF NOT EXISTS {} ({})", table, definitions)
    }
}
