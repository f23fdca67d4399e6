//! Source CSV reader
//!
//! Reads the yearly ZNO open-data exports (semicolon separated,
//! Windows-1251 encoded) into a single [`Frame`]:
//!
//! - header names are lower-cased
//! - every `*ball*` column is a score: decimal commas become periods and the
//!   value is parsed as `f64`
//! - `birth` and `ukradaptscale` are integers and may not be missing
//! - a `year` column is inserted at position 3 with the file's year
//!
//! Any read or parse failure is fatal and names the offending file.

use encoding_rs::{Encoding, WINDOWS_1251};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zno_common::types::{Column, Frame, Value, ValueKind};
use zno_common::{Result, ZnoError};

/// Field delimiter of the exports
pub const DELIMITER: u8 = b';';

/// Substring marking score columns
pub const SCORE_MARKER: &str = "ball";

/// Columns coerced to integers
pub const INTEGER_COLUMNS: [&str; 2] = ["birth", "ukradaptscale"];

pub const YEAR_COLUMN: &str = "year";

/// Zero-based position of the inserted year column
pub const YEAR_COLUMN_POSITION: usize = 3;

/// Field contents read as missing values
pub const NA_MARKERS: &[&str] = &[
    "", "null", "NULL", "NaN", "nan", "-NaN", "-nan", "NA", "N/A", "n/a", "#N/A", "<NA>", "None",
];

/// One yearly export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub year: i64,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, year: i64) -> Self {
        Self {
            path: path.into(),
            year,
        }
    }
}

/// Column kind decided from the normalized header name
pub fn column_kind(name: &str) -> ValueKind {
    if name.contains(SCORE_MARKER) {
        ValueKind::Fractional
    } else if INTEGER_COLUMNS.contains(&name) {
        ValueKind::Integer
    } else {
        ValueKind::Text
    }
}

fn is_missing(field: &str) -> bool {
    NA_MARKERS.contains(&field)
}

fn decode<'a>(bytes: &'a [u8], encoding: &'static Encoding, line: u64, column: &str) -> Result<std::borrow::Cow<'a, str>> {
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        return Err(ZnoError::parse(
            line,
            column,
            format!("bytes are not valid {}", encoding.name()),
        ));
    }
    Ok(text)
}

fn coerce(column: &Column, field: &str, line: u64) -> Result<Value> {
    match column.kind {
        ValueKind::Text => Ok(Value::Text((!is_missing(field)).then(|| field.to_string()))),
        ValueKind::Fractional => {
            if is_missing(field) {
                return Ok(Value::Fractional(None));
            }
            field
                .trim()
                .replace(',', ".")
                .parse::<f64>()
                .map(|v| Value::Fractional(Some(v)))
                .map_err(|e| ZnoError::parse(line, &column.name, format!("'{}': {}", field, e)))
        },
        ValueKind::Integer => {
            if is_missing(field) {
                return Err(ZnoError::parse(line, &column.name, "missing integer value"));
            }
            field
                .trim()
                .parse::<i64>()
                .map(|v| Value::Integer(Some(v)))
                .map_err(|e| ZnoError::parse(line, &column.name, format!("'{}': {}", field, e)))
        },
    }
}

/// Parse one export from any reader
pub fn read_frame<R: Read>(reader: R, year: i64) -> Result<Frame> {
    read_frame_with_encoding(reader, year, WINDOWS_1251)
}

fn read_frame_with_encoding<R: Read>(
    reader: R,
    year: i64,
    encoding: &'static Encoding,
) -> Result<Frame> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .from_reader(reader);

    let headers = csv_reader.byte_headers()?.clone();
    let columns = headers
        .iter()
        .enumerate()
        .map(|(idx, raw)| {
            let name = decode(raw, encoding, 1, &format!("#{}", idx))?.to_lowercase();
            let kind = column_kind(&name);
            Ok(Column::new(name, kind))
        })
        .collect::<Result<Vec<_>>>()?;

    for required in INTEGER_COLUMNS {
        if !columns.iter().any(|c| c.name == required) {
            return Err(ZnoError::schema(format!("required column '{}' is missing", required)));
        }
    }

    let mut frame = Frame::new(columns.clone());
    let mut record = csv::ByteRecord::new();
    while csv_reader.read_byte_record(&mut record)? {
        let line = record.position().map_or(0, |p| p.line());
        let row = columns
            .iter()
            .zip(record.iter())
            .map(|(column, raw)| {
                let field = decode(raw, encoding, line, &column.name)?;
                coerce(column, &field, line)
            })
            .collect::<Result<Vec<_>>>()?;
        frame.push_row(row)?;
    }

    frame.insert_column(
        YEAR_COLUMN_POSITION,
        Column::new(YEAR_COLUMN, ValueKind::Integer),
        Value::Integer(Some(year)),
    )?;

    debug!(year, rows = frame.len(), columns = frame.columns().len(), "Parsed export");
    Ok(frame)
}

/// Read one export from disk
pub fn read_source(source: &SourceFile) -> Result<Frame> {
    read_path(&source.path, source.year).map_err(|e| e.in_file(&source.path))
}

fn read_path(path: &Path, year: i64) -> Result<Frame> {
    let file = File::open(path)?;
    read_frame(file, year)
}

/// Read every export and concatenate them in the given order
pub fn read_sources(sources: &[SourceFile]) -> Result<Frame> {
    info!(files = sources.len(), "Reading .csv files");

    let mut combined: Option<Frame> = None;
    for source in sources {
        let frame = read_source(source)?;
        info!(path = %source.path.display(), year = source.year, rows = frame.len(), "Processed export");

        match combined.as_mut() {
            Some(all) => all.append(frame).map_err(|e| e.in_file(&source.path))?,
            None => combined = Some(frame),
        }
    }

    let frame = combined.ok_or_else(|| ZnoError::Config("no source files configured".to_string()))?;
    info!(rows = frame.len(), "Successfully processed .csv files");
    Ok(frame)
}
