//! Sensor Windowing
//!
//! Holds raw accelerometer/gyroscope samples and slices them into fixed-length,
//! overlapping windows for feature extraction.

mod segmenter;
mod table;
mod window;

pub use segmenter::{segment, WindowConfig, Windows};
pub use table::SampleTable;
pub use window::{SensorWindow, SpatialAxis, TriaxialSignal};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of leading columns a sample table must provide (accel xyz, gyro xyz)
pub const SENSOR_CHANNELS: usize = 6;

/// Errors raised while building tables or cutting windows
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WindowError {
    /// Fewer samples than a single window needs
    #[error("Insufficient data: need at least {required} samples, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Table or signal does not have the expected number of columns
    #[error("Shape mismatch: expected at least {expected} columns, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Two signals that must be combined sample-by-sample differ in length
    #[error("Length mismatch: expected {expected} samples, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Window size / overlap combination cannot produce a finite sequence
    #[error("Invalid window configuration: {0}")]
    InvalidConfig(String),
}

/// One time instant of raw inertial data
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Accelerometer x/y/z
    pub accel: [f64; 3],
    /// Gyroscope x/y/z
    pub gyro: [f64; 3],
}

impl RawSample {
    /// Build a sample from six consecutive channel values
    pub fn from_channels(channels: [f64; SENSOR_CHANNELS]) -> Self {
        Self {
            accel: [channels[0], channels[1], channels[2]],
            gyro: [channels[3], channels[4], channels[5]],
        }
    }

    /// Channel values in table column order
    pub fn channels(&self) -> [f64; SENSOR_CHANNELS] {
        [
            self.accel[0],
            self.accel[1],
            self.accel[2],
            self.gyro[0],
            self.gyro[1],
            self.gyro[2],
        ]
    }
}
