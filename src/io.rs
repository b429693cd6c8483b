//! Delimited-text helpers shared by the table readers and writers.

use crate::error::{AbrgError, Result};
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

/// Cell values treated as missing when reading numeric or metadata tables.
pub const MISSING_TOKENS: [&str; 4] = ["", "NA", "na", "NaN"];

/// Pick the field delimiter from a file extension: tab for `.tsv`/`.txt`,
/// comma otherwise.
pub fn delimiter_for<P: AsRef<Path>>(path: P) -> u8 {
    match path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("tsv") | Some("txt") | Some("tab") => b'\t',
        _ => b',',
    }
}

/// Build a CSV reader over any byte source.
pub fn reader_from<R: Read>(reader: R, delimiter: u8) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Open a delimited file for reading, choosing the delimiter from the extension.
pub fn open_reader<P: AsRef<Path>>(path: P) -> Result<csv::Reader<File>> {
    let delimiter = delimiter_for(&path);
    let file = File::open(path)?;
    Ok(reader_from(file, delimiter))
}

/// Create a delimited writer, creating parent directories as needed.
pub fn create_writer<P: AsRef<Path>>(path: P) -> Result<csv::Writer<File>> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    Ok(csv::WriterBuilder::new()
        .delimiter(delimiter_for(path))
        .from_writer(file))
}

/// Parse a numeric cell, mapping missing tokens to NaN.
pub fn parse_number(raw: &str, row: usize, col: usize) -> Result<f64> {
    let trimmed = raw.trim();
    if MISSING_TOKENS.contains(&trimmed) {
        return Ok(f64::NAN);
    }
    trimmed.parse::<f64>().map_err(|_| AbrgError::InvalidValue {
        value: raw.to_string(),
        row,
        col,
    })
}

/// Check whether a cell holds a missing-value token.
pub fn is_missing(raw: &str) -> bool {
    MISSING_TOKENS.contains(&raw.trim())
}

/// Format a float for table output.
pub fn fmt_f64(value: f64) -> String {
    if value.is_nan() {
        "NA".to_string()
    } else {
        format!("{}", value)
    }
}
