//! Sliding-Window Segmenter

use ndarray::s;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::table::SampleTable;
use crate::window::{SensorWindow, TriaxialSignal};
use crate::WindowError;

/// Default window length (2.56 s at 50 Hz)
pub const DEFAULT_WINDOW_SIZE: usize = 128;

/// Default overlap between consecutive windows (50%)
pub const DEFAULT_OVERLAP: usize = 64;

/// Window size and overlap, in samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Samples per window
    pub window_size: usize,
    /// Samples shared by consecutive windows
    pub overlap: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl WindowConfig {
    /// Create a config, rejecting combinations with a zero step
    pub fn new(window_size: usize, overlap: usize) -> Result<Self, WindowError> {
        let config = Self {
            window_size,
            overlap,
        };
        config.validate()?;
        Ok(config)
    }

    /// Non-overlapping windows of the given size
    pub fn tumbling(window_size: usize) -> Self {
        Self {
            window_size,
            overlap: 0,
        }
    }

    /// Check that the step is positive
    pub fn validate(&self) -> Result<(), WindowError> {
        if self.window_size == 0 {
            return Err(WindowError::InvalidConfig(
                "window_size must be greater than zero".to_string(),
            ));
        }
        if self.overlap >= self.window_size {
            return Err(WindowError::InvalidConfig(format!(
                "overlap {} must be smaller than window_size {}",
                self.overlap, self.window_size
            )));
        }
        Ok(())
    }

    /// Distance between consecutive window starts
    pub fn step(&self) -> usize {
        self.window_size - self.overlap
    }

    /// Number of complete windows in a stream of `total` samples
    pub fn window_count(&self, total: usize) -> usize {
        if total < self.window_size || self.overlap >= self.window_size {
            0
        } else {
            (total - self.window_size) / self.step() + 1
        }
    }
}

/// Lazy iterator over the complete windows of a table
#[derive(Debug)]
pub struct Windows<'a> {
    table: &'a SampleTable,
    window_size: usize,
    step: usize,
    next_start: usize,
    next_index: usize,
}

impl<'a> Windows<'a> {
    fn remaining(&self) -> usize {
        let total = self.table.len();
        if self.next_start + self.window_size > total {
            0
        } else {
            (total - self.window_size - self.next_start) / self.step + 1
        }
    }
}

impl<'a> Iterator for Windows<'a> {
    type Item = SensorWindow;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next_start;
        let end = start + self.window_size;
        if end > self.table.len() {
            return None;
        }

        let data = self.table.as_array();
        let accel = TriaxialSignal::from_array(data.slice(s![start..end, 0..3]).to_owned()).ok()?;
        let gyro = TriaxialSignal::from_array(data.slice(s![start..end, 3..6]).to_owned()).ok()?;

        let window = SensorWindow {
            index: self.next_index,
            start,
            accel,
            gyro,
        };
        self.next_start += self.step;
        self.next_index += 1;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl<'a> ExactSizeIterator for Windows<'a> {}

/// Slice a sample table into overlapping sensor windows.
///
/// Windows start at `0, step, 2*step, ...` and never run past the end of the
/// table; trailing samples that cannot fill a window are dropped.
pub fn segment<'a>(
    table: &'a SampleTable,
    config: &WindowConfig,
) -> Result<Windows<'a>, WindowError> {
    config.validate()?;
    table.require_sensor_channels()?;

    if table.len() < config.window_size {
        return Err(WindowError::InsufficientData {
            required: config.window_size,
            actual: table.len(),
        });
    }

    debug!(
        "Segmenting {} samples: window={}, step={}, windows={}",
        table.len(),
        config.window_size,
        config.step(),
        config.window_count(table.len())
    );

    Ok(Windows {
        table,
        window_size: config.window_size,
        step: config.step(),
        next_start: 0,
        next_index: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::SpatialAxis;
    use ndarray::Array2;
    use proptest::prelude::*;

    fn ramp_table(rows: usize, columns: usize) -> SampleTable {
        SampleTable::new(Array2::from_shape_fn((rows, columns), |(i, c)| {
            (i * 10 + c) as f64
        }))
    }

    #[test]
    fn test_default_window_count() {
        let table = ramp_table(512, 6);
        let windows: Vec<_> = segment(&table, &WindowConfig::default()).unwrap().collect();
        // floor((512 - 128) / 64) + 1
        assert_eq!(windows.len(), 7);
        assert_eq!(windows[0].start, 0);
        assert_eq!(windows[1].start, 64);
        assert_eq!(windows[6].start, 384);
        assert!(windows.iter().all(|w| w.len() == 128));
    }

    #[test]
    fn test_trailing_samples_dropped() {
        let table = ramp_table(300, 6);
        let windows: Vec<_> = segment(&table, &WindowConfig::default()).unwrap().collect();
        assert_eq!(windows.len(), 3);
        let last = windows.last().unwrap();
        assert!(last.start + last.len() <= 300);
    }

    #[test]
    fn test_insufficient_data() {
        let table = ramp_table(127, 6);
        let err = segment(&table, &WindowConfig::default()).unwrap_err();
        assert_eq!(
            err,
            WindowError::InsufficientData {
                required: 128,
                actual: 127
            }
        );
    }

    #[test]
    fn test_exactly_one_window() {
        let table = ramp_table(128, 6);
        let windows = segment(&table, &WindowConfig::default()).unwrap();
        assert_eq!(windows.len(), 1);
    }

    #[test]
    fn test_too_few_columns() {
        let table = ramp_table(256, 5);
        assert!(matches!(
            segment(&table, &WindowConfig::default()),
            Err(WindowError::ShapeMismatch { expected: 6, actual: 5 })
        ));
    }

    #[test]
    fn test_extra_columns_ignored() {
        let table = ramp_table(128, 9);
        let window = segment(&table, &WindowConfig::default())
            .unwrap()
            .next()
            .unwrap();
        // Row 5: accel columns 0..3, gyro columns 3..6
        assert_eq!(window.accel.axis(SpatialAxis::X)[5], 50.0);
        assert_eq!(window.accel.axis(SpatialAxis::Z)[5], 52.0);
        assert_eq!(window.gyro.axis(SpatialAxis::X)[5], 53.0);
        assert_eq!(window.gyro.axis(SpatialAxis::Z)[5], 55.0);
    }

    #[test]
    fn test_window_contents_follow_start() {
        let table = ramp_table(256, 6);
        let windows: Vec<_> = segment(&table, &WindowConfig::default()).unwrap().collect();
        assert_eq!(windows[1].index, 1);
        assert_eq!(windows[1].accel.axis(SpatialAxis::X)[0], 640.0);
    }

    #[test]
    fn test_invalid_overlap() {
        assert!(WindowConfig::new(128, 128).is_err());
        assert!(WindowConfig::new(0, 0).is_err());
        assert!(WindowConfig::new(128, 64).is_ok());

        let table = ramp_table(256, 6);
        let config = WindowConfig {
            window_size: 64,
            overlap: 80,
        };
        assert!(matches!(
            segment(&table, &config),
            Err(WindowError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_tumbling_windows() {
        let table = ramp_table(400, 6);
        let windows = segment(&table, &WindowConfig::tumbling(128)).unwrap();
        assert_eq!(windows.len(), 3);
    }

    proptest! {
        #[test]
        fn prop_window_count_matches_formula(len in 0usize..2000) {
            let table = ramp_table(len, 6);
            let config = WindowConfig::default();
            match segment(&table, &config) {
                Ok(windows) => {
                    prop_assert!(len >= 128);
                    let expected = (len - 128) / 64 + 1;
                    prop_assert_eq!(windows.len(), expected);
                    prop_assert_eq!(windows.count(), expected);
                }
                Err(e) => {
                    prop_assert!(len < 128);
                    prop_assert_eq!(e, WindowError::InsufficientData { required: 128, actual: len });
                }
            }
        }

        #[test]
        fn prop_windows_stay_in_bounds(len in 1usize..600, size in 1usize..100, overlap in 0usize..100) {
            prop_assume!(overlap < size);
            let table = ramp_table(len, 6);
            let config = WindowConfig::new(size, overlap).unwrap();
            if let Ok(windows) = segment(&table, &config) {
                for window in windows {
                    prop_assert_eq!(window.len(), size);
                    prop_assert!(window.start + size <= len);
                }
            }
        }
    }
}
