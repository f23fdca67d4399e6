//! In-memory tabular types shared by the reader and the loader
//!
//! A [`Frame`] is an ordered set of rows over a fixed list of typed columns.
//! Every value in a column has the column's [`ValueKind`]; `push_row`
//! enforces this so downstream code can rely on it.

use crate::error::{Result, ZnoError};
use serde::{Deserialize, Serialize};

/// Kind of value a column holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Free text
    Text,
    /// 64-bit signed integer
    Integer,
    /// Double precision floating point
    Fractional,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueKind::Text => write!(f, "text"),
            ValueKind::Integer => write!(f, "integer"),
            ValueKind::Fractional => write!(f, "fractional"),
        }
    }
}

/// A single cell. `None` is a missing value (SQL NULL).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(Option<String>),
    Integer(Option<i64>),
    Fractional(Option<f64>),
}

impl Value {
    /// Non-null text value
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(Some(value.into()))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Text(_) => ValueKind::Text,
            Value::Integer(_) => ValueKind::Integer,
            Value::Fractional(_) => ValueKind::Fractional,
        }
    }
}

/// Named, typed column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ValueKind,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// One row of a [`Frame`], in column order
pub type Row = Vec<Value>;

/// Ordered rows over a fixed column set
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl Frame {
    /// Create an empty frame with the given columns
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Append a row, checking arity and per-column kinds
    pub fn push_row(&mut self, row: Row) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(ZnoError::schema(format!(
                "row has {} values but frame has {} columns",
                row.len(),
                self.columns.len()
            )));
        }

        if let Some((column, value)) = self
            .columns
            .iter()
            .zip(row.iter())
            .find(|(column, value)| column.kind != value.kind())
        {
            return Err(ZnoError::schema(format!(
                "column '{}' expects {} values, got {}",
                column.name,
                column.kind,
                value.kind()
            )));
        }

        self.rows.push(row);
        Ok(())
    }

    /// Insert a column at `index`, filling every existing row with `fill`
    pub fn insert_column(&mut self, index: usize, column: Column, fill: Value) -> Result<()> {
        if index > self.columns.len() {
            return Err(ZnoError::schema(format!(
                "cannot insert column '{}' at position {} of {}",
                column.name,
                index,
                self.columns.len()
            )));
        }
        if column.kind != fill.kind() {
            return Err(ZnoError::schema(format!(
                "column '{}' expects {} values, got {}",
                column.name,
                column.kind,
                fill.kind()
            )));
        }
        if self.column_index(&column.name).is_some() {
            return Err(ZnoError::schema(format!(
                "column '{}' already exists",
                column.name
            )));
        }

        self.columns.insert(index, column);
        for row in &mut self.rows {
            row.insert(index, fill.clone());
        }
        Ok(())
    }

    /// Concatenate another frame with an identical column set below this one
    pub fn append(&mut self, other: Frame) -> Result<()> {
        if self.columns != other.columns {
            let ours: Vec<_> = self.columns.iter().map(|c| c.name.as_str()).collect();
            let theirs: Vec<_> = other.columns.iter().map(|c| c.name.as_str()).collect();
            return Err(ZnoError::schema(format!(
                "column sets differ: [{}] vs [{}]",
                ours.join(", "),
                theirs.join(", ")
            )));
        }
        self.rows.extend(other.rows);
        Ok(())
    }

    /// Rows `[offset, offset + len)`, clamped to the frame
    pub fn slice(&self, offset: usize, len: usize) -> &[Row] {
        let start = offset.min(self.rows.len());
        let end = offset.saturating_add(len).min(self.rows.len());
        &self.rows[start..end]
    }
}
