//! Sensor Recording Ingestion
//!
//! Detects the layout of uploaded IMU recordings (CSV or whitespace-separated
//! text), parses them into sample tables, and validates upload limits.

mod error;
mod format;
mod validator;

pub use error::IngestError;
pub use format::{detect_format, file_extension, load_file, parse_table, SensorFormat};
pub use validator::{UploadLimits, UploadValidator};
