//! Upload Validation

use sensor_window::{SampleTable, SENSOR_CHANNELS};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::IngestError;
use crate::format::{detect_format, file_extension, parse_table, ALLOWED_EXTENSIONS};

/// Limits applied to uploaded recordings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadLimits {
    /// Maximum accepted upload size in bytes
    pub max_bytes: usize,
    /// Minimum number of columns in the parsed table
    pub min_columns: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            min_columns: SENSOR_CHANNELS,
        }
    }
}

/// Validates uploads and turns them into sample tables
pub struct UploadValidator {
    limits: UploadLimits,
}

impl UploadValidator {
    /// Create a new validator with given limits
    pub fn new(limits: UploadLimits) -> Self {
        Self { limits }
    }

    /// Configured limits
    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    /// Check the file name carries an accepted extension
    pub fn validate_name(&self, filename: &str) -> Result<(), IngestError> {
        match file_extension(filename) {
            Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
            _ => Err(IngestError::UnsupportedFormat(format!(
                "{:?} (allowed: .{})",
                filename,
                ALLOWED_EXTENSIONS.join(", .")
            ))),
        }
    }

    /// Check the payload is non-empty and within the size limit
    pub fn validate_contents(&self, contents: &[u8]) -> Result<(), IngestError> {
        if contents.is_empty() {
            return Err(IngestError::EmptyFile);
        }
        if contents.len() > self.limits.max_bytes {
            return Err(IngestError::TooLarge {
                size: contents.len(),
                limit: self.limits.max_bytes,
            });
        }
        Ok(())
    }

    /// Check the parsed table has the sensor channels
    pub fn validate_table(&self, table: &SampleTable) -> Result<(), IngestError> {
        if table.columns() < self.limits.min_columns {
            return Err(IngestError::TooFewColumns {
                expected: self.limits.min_columns,
                actual: table.columns(),
            });
        }
        Ok(())
    }

    /// Validate an upload end to end and return its sample table
    pub fn ingest(&self, filename: &str, contents: &[u8]) -> Result<SampleTable, IngestError> {
        let result = self
            .validate_name(filename)
            .and_then(|_| self.validate_contents(contents))
            .and_then(|_| detect_format(filename, contents))
            .and_then(|format| parse_table(contents, format))
            .and_then(|table| self.validate_table(&table).map(|_| table));

        match &result {
            Ok(table) => debug!(
                "Ingested {}: {} samples x {} channels",
                filename,
                table.len(),
                table.columns()
            ),
            Err(e) => warn!("Rejected upload {}: {}", filename, e),
        }
        result
    }
}

impl Default for UploadValidator {
    fn default() -> Self {
        Self::new(UploadLimits::default())
    }
}
