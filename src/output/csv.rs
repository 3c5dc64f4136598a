//! CSV output sink
//!
//! Writes the final record sequence as a CSV file with a fixed, configured
//! column order. Fields a record does not carry become empty cells; fields
//! it carries beyond the configured columns are ignored.

use crate::config::OutputConfig;
use crate::output::traits::{ResultSink, SinkResult};
use crate::record::Record;
use std::borrow::Cow;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Sink that writes records to a CSV file
pub struct CsvSink {
    path: PathBuf,
    columns: Vec<String>,
}

impl CsvSink {
    /// Creates a sink writing to the given path with the given column order
    pub fn new(path: impl Into<PathBuf>, columns: Vec<String>) -> Self {
        Self {
            path: path.into(),
            columns,
        }
    }

    /// Creates a sink from the `[output]` section of a source config
    pub fn from_config(output: &OutputConfig) -> Self {
        Self::new(&output.path, output.columns.clone())
    }

    /// Path this sink writes to
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for CsvSink {
    fn write(&self, records: &[Record]) -> SinkResult<()> {
        let csv = format_csv(records, &self.columns);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = File::create(&self.path)?;
        file.write_all(csv.as_bytes())?;

        tracing::info!("wrote {} records to {}", records.len(), self.path.display());
        Ok(())
    }
}

/// Formats records as CSV with a header row
///
/// # Arguments
///
/// * `records` - The records to format
/// * `columns` - Column order; missing fields become empty cells
///
/// # Returns
///
/// A CSV string with CRLF line endings
pub fn format_csv(records: &[Record], columns: &[String]) -> String {
    let mut csv = String::new();

    push_row(&mut csv, columns.iter().map(String::as_str));

    for record in records {
        push_row(
            &mut csv,
            columns.iter().map(|column| record.get(column).unwrap_or("")),
        );
    }

    csv
}

fn push_row<'a>(csv: &mut String, cells: impl Iterator<Item = &'a str>) {
    let mut first = true;
    for cell in cells {
        if !first {
            csv.push(',');
        }
        first = false;
        csv.push_str(&escape_field(cell));
    }
    csv.push_str("\r\n");
}

/// Quotes a field when it contains a delimiter, quote, or line break
fn escape_field(value: &str) -> Cow<'_, str> {
    if !value.contains(['"', ',', '\n', '\r']) {
        return Cow::Borrowed(value);
    }

    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('"');
    for ch in value.chars() {
        if ch == '"' {
            escaped.push('"');
        }
        escaped.push(ch);
    }
    escaped.push('"');

    Cow::Owned(escaped)
}
