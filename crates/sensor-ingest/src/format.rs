//! Format Detection and Table Parsing

use std::path::Path;

use csv::{ReaderBuilder, Trim};
use sensor_window::SampleTable;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::IngestError;

/// Extensions accepted at the upload boundary
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["csv", "txt", "xlsx"];

/// Text layout of a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorFormat {
    /// Single-byte delimiter (comma or semicolon)
    Delimited(u8),
    /// Columns separated by runs of spaces/tabs
    Whitespace,
}

/// Lowercased extension after the last dot, if any
pub fn file_extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

fn decode(contents: &[u8]) -> Result<&str, IngestError> {
    let text = std::str::from_utf8(contents).map_err(|e| IngestError::Encoding(e.to_string()))?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text))
}

/// Decide how a recording is laid out.
///
/// The extension gates what is accepted at all; the first non-blank line then
/// picks the delimiter.
pub fn detect_format(filename: &str, contents: &[u8]) -> Result<SensorFormat, IngestError> {
    let ext = file_extension(filename).unwrap_or_default();
    match ext.as_str() {
        "csv" | "txt" => {}
        "xlsx" => {
            return Err(IngestError::UnsupportedFormat(
                "xlsx workbooks are not supported; export the sheet as CSV".to_string(),
            ))
        }
        _ => {
            return Err(IngestError::UnsupportedFormat(format!(
                "{:?} (allowed: .{})",
                filename,
                ALLOWED_EXTENSIONS.join(", .")
            )))
        }
    }

    let text = decode(contents)?;
    let first = text
        .lines()
        .find(|line| !line.trim().is_empty())
        .ok_or(IngestError::EmptyFile)?;

    let format = if first.contains(',') {
        SensorFormat::Delimited(b',')
    } else if first.contains(';') {
        SensorFormat::Delimited(b';')
    } else {
        SensorFormat::Whitespace
    };

    debug!("Detected {:?} for {}", format, filename);
    Ok(format)
}

/// Parse recording bytes into a sample table
pub fn parse_table(contents: &[u8], format: SensorFormat) -> Result<SampleTable, IngestError> {
    let text = decode(contents)?;

    let rows: Vec<Vec<String>> = match format {
        SensorFormat::Delimited(delimiter) => {
            let mut reader = ReaderBuilder::new()
                .has_headers(false)
                .delimiter(delimiter)
                .flexible(true)
                .trim(Trim::All)
                .from_reader(text.as_bytes());

            let mut rows = Vec::new();
            for record in reader.records() {
                let record = record?;
                if record.iter().all(|cell| cell.is_empty()) {
                    continue;
                }
                rows.push(record.iter().map(str::to_string).collect());
            }
            rows
        }
        SensorFormat::Whitespace => text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.split_whitespace().map(str::to_string).collect())
            .collect(),
    };

    rows_to_table(&rows)
}

/// Cells of a row without the empty cells left by a trailing delimiter
fn trim_trailing_empty(row: &[String]) -> &[String] {
    let end = row
        .iter()
        .rposition(|cell| !cell.is_empty())
        .map_or(0, |i| i + 1);
    &row[..end]
}

/// A header row has at least one non-empty cell that is not a number
fn is_header(row: &[String]) -> bool {
    row.iter()
        .any(|cell| !cell.is_empty() && cell.parse::<f64>().is_err())
}

/// Convert string cells into a numeric table, skipping one leading header row
fn rows_to_table(rows: &[Vec<String>]) -> Result<SampleTable, IngestError> {
    let rows: Vec<&[String]> = rows.iter().map(|row| trim_trailing_empty(row)).collect();
    let first = rows.first().ok_or(IngestError::EmptyFile)?;
    let has_header = is_header(first);
    let data_offset = usize::from(has_header);

    let data_rows = &rows[data_offset..];
    let width = data_rows.first().map(|row| row.len()).ok_or(IngestError::NoData)?;

    let mut parsed = Vec::with_capacity(data_rows.len());
    for (idx, row) in data_rows.iter().enumerate() {
        let row_number = idx + data_offset + 1;
        if row.len() != width {
            return Err(IngestError::RaggedRow {
                row: row_number,
                expected: width,
                actual: row.len(),
            });
        }

        let values = row
            .iter()
            .enumerate()
            .map(|(col, cell)| {
                cell.parse::<f64>().map_err(|_| IngestError::InvalidNumber {
                    row: row_number,
                    column: col + 1,
                    value: cell.clone(),
                })
            })
            .collect::<Result<Vec<f64>, _>>()?;
        parsed.push(values);
    }

    debug!(
        "Parsed {} rows x {} columns (header: {})",
        parsed.len(),
        width,
        has_header
    );
    Ok(SampleTable::from_rows(&parsed)?)
}

/// Read and parse a recording from disk
pub fn load_file(path: impl AsRef<Path>) -> Result<SampleTable, IngestError> {
    let path = path.as_ref();
    let contents = std::fs::read(path)?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let format = detect_format(&filename, &contents)?;
    parse_table(&contents, format)
}
