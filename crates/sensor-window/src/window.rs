//! Triaxial Signals and Sensor Windows

use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::WindowError;

/// Spatial axis of a triaxial sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpatialAxis {
    X,
    Y,
    Z,
}

impl SpatialAxis {
    /// All axes in column order
    pub const ALL: [SpatialAxis; 3] = [SpatialAxis::X, SpatialAxis::Y, SpatialAxis::Z];

    /// Column index of this axis
    pub fn index(&self) -> usize {
        match self {
            SpatialAxis::X => 0,
            SpatialAxis::Y => 1,
            SpatialAxis::Z => 2,
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SpatialAxis::X => "X",
            SpatialAxis::Y => "Y",
            SpatialAxis::Z => "Z",
        }
    }
}

/// N×3 signal, one column per spatial axis
#[derive(Debug, Clone, PartialEq)]
pub struct TriaxialSignal {
    data: Array2<f64>,
}

impl TriaxialSignal {
    /// Wrap an N×3 array
    pub fn from_array(data: Array2<f64>) -> Result<Self, WindowError> {
        if data.ncols() != 3 {
            return Err(WindowError::ShapeMismatch {
                expected: 3,
                actual: data.ncols(),
            });
        }
        Ok(Self { data })
    }

    /// Build from per-sample xyz triples
    pub fn from_rows(rows: &[[f64; 3]]) -> Self {
        let data = Array2::from_shape_fn((rows.len(), 3), |(i, j)| rows[i][j]);
        Self { data }
    }

    /// Build from three equally long axis columns
    pub fn from_axes(x: &[f64], y: &[f64], z: &[f64]) -> Result<Self, WindowError> {
        let n = x.len();
        for axis in [y, z] {
            if axis.len() != n {
                return Err(WindowError::LengthMismatch {
                    expected: n,
                    actual: axis.len(),
                });
            }
        }
        let data = Array2::from_shape_fn((n, 3), |(i, j)| match j {
            0 => x[i],
            1 => y[i],
            _ => z[i],
        });
        Ok(Self { data })
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    /// Check if the signal has no samples
    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    /// View one axis
    pub fn axis(&self, axis: SpatialAxis) -> ArrayView1<'_, f64> {
        self.data.column(axis.index())
    }

    /// Copy one axis into a contiguous vector
    pub fn axis_values(&self, axis: SpatialAxis) -> Vec<f64> {
        self.axis(axis).to_vec()
    }

    /// Apply a per-axis transform; every output column must keep the signal length
    pub fn map_axes<F, E>(&self, mut f: F) -> Result<Self, E>
    where
        F: FnMut(&[f64]) -> Result<Vec<f64>, E>,
        E: From<WindowError>,
    {
        let x = f(&self.axis_values(SpatialAxis::X))?;
        let y = f(&self.axis_values(SpatialAxis::Y))?;
        let z = f(&self.axis_values(SpatialAxis::Z))?;
        if x.len() != self.len() {
            return Err(WindowError::LengthMismatch {
                expected: self.len(),
                actual: x.len(),
            }
            .into());
        }
        Ok(Self::from_axes(&x, &y, &z)?)
    }

    /// Element-wise difference `self - other`
    pub fn difference(&self, other: &TriaxialSignal) -> Result<Self, WindowError> {
        if self.len() != other.len() {
            return Err(WindowError::LengthMismatch {
                expected: self.len(),
                actual: other.len(),
            });
        }
        Ok(Self {
            data: &self.data - &other.data,
        })
    }

    /// Per-sample Euclidean norm across the three axes
    pub fn magnitude(&self) -> Vec<f64> {
        self.data
            .axis_iter(Axis(0))
            .map(|row| (row[0] * row[0] + row[1] * row[1] + row[2] * row[2]).sqrt())
            .collect()
    }

    /// Borrow the underlying array
    pub fn as_array(&self) -> &Array2<f64> {
        &self.data
    }
}

/// Fixed-length slice of a sensor stream, split into accelerometer and gyroscope
#[derive(Debug, Clone, PartialEq)]
pub struct SensorWindow {
    /// Position of this window in the segmented sequence
    pub index: usize,
    /// First table row covered by the window
    pub start: usize,
    /// Accelerometer block (columns 0..3)
    pub accel: TriaxialSignal,
    /// Gyroscope block (columns 3..6)
    pub gyro: TriaxialSignal,
}

impl SensorWindow {
    /// Pair an accelerometer and gyroscope block of equal length
    pub fn new(
        index: usize,
        start: usize,
        accel: TriaxialSignal,
        gyro: TriaxialSignal,
    ) -> Result<Self, WindowError> {
        if accel.len() != gyro.len() {
            return Err(WindowError::LengthMismatch {
                expected: accel.len(),
                actual: gyro.len(),
            });
        }
        Ok(Self {
            index,
            start,
            accel,
            gyro,
        })
    }

    /// Number of samples in the window
    pub fn len(&self) -> usize {
        self.accel.len()
    }

    /// Check if the window holds no samples
    pub fn is_empty(&self) -> bool {
        self.accel.is_empty()
    }
}
