//! Parsed Sample Table

use ndarray::{Array2, ArrayView1, Axis};

use crate::{RawSample, WindowError, SENSOR_CHANNELS};

/// Row-major table of sensor readings (rows = time, columns = channels)
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTable {
    data: Array2<f64>,
}

impl SampleTable {
    /// Wrap an existing 2-D array
    pub fn new(data: Array2<f64>) -> Self {
        Self { data }
    }

    /// Build a table from parsed rows; every row must have the same width
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, WindowError> {
        let columns = rows.first().map(Vec::len).unwrap_or(0);
        let mut flat = Vec::with_capacity(rows.len() * columns);

        for row in rows {
            if row.len() != columns {
                return Err(WindowError::ShapeMismatch {
                    expected: columns,
                    actual: row.len(),
                });
            }
            flat.extend_from_slice(row);
        }

        let data = Array2::from_shape_vec((rows.len(), columns), flat).map_err(|e| {
            WindowError::InvalidConfig(format!("cannot shape sample table: {}", e))
        })?;
        Ok(Self { data })
    }

    /// Build a six-column table from typed samples
    pub fn from_samples(samples: &[RawSample]) -> Self {
        let data = Array2::from_shape_fn((samples.len(), SENSOR_CHANNELS), |(row, col)| {
            samples[row].channels()[col]
        });
        Self { data }
    }

    /// Number of samples (rows)
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    /// Check if the table holds no samples
    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    /// Number of channels (columns)
    pub fn columns(&self) -> usize {
        self.data.ncols()
    }

    /// Fail unless the first six sensor channels are present
    pub fn require_sensor_channels(&self) -> Result<(), WindowError> {
        if self.columns() < SENSOR_CHANNELS {
            return Err(WindowError::ShapeMismatch {
                expected: SENSOR_CHANNELS,
                actual: self.columns(),
            });
        }
        Ok(())
    }

    /// Read one row as a typed sample (extra columns ignored)
    pub fn sample(&self, row: usize) -> Option<RawSample> {
        if row >= self.len() || self.columns() < SENSOR_CHANNELS {
            return None;
        }
        let r = self.data.row(row);
        Some(RawSample::from_channels([r[0], r[1], r[2], r[3], r[4], r[5]]))
    }

    /// View a single channel over time
    pub fn column(&self, col: usize) -> Option<ArrayView1<'_, f64>> {
        (col < self.columns()).then(|| self.data.column(col))
    }

    /// First `count` values of a channel (fewer if the table is shorter)
    pub fn column_head(&self, col: usize, count: usize) -> Vec<f64> {
        self.column(col)
            .map(|c| c.iter().take(count).copied().collect())
            .unwrap_or_default()
    }

    /// Iterate rows as views
    pub fn rows(&self) -> impl Iterator<Item = ArrayView1<'_, f64>> {
        self.data.axis_iter(Axis(0))
    }

    /// Borrow the underlying array
    pub fn as_array(&self) -> &Array2<f64> {
        &self.data
    }
}
