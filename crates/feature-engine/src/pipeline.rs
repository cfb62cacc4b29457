//! Window-to-Matrix Pipeline
//!
//! Segments a sample table and extracts one feature vector per window in
//! parallel. Rows of the resulting matrix follow window order.

use std::time::Instant;

use ndarray::{Array2, ArrayView1, Axis};
use rayon::prelude::*;
use sensor_window::{segment, SampleTable, SensorWindow, WindowConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::features::{FeatureConfig, FeatureExtractor, FeatureVector, FEATURE_DIMENSION};
use crate::FeatureError;

/// Segmentation and extraction settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Window size and overlap
    pub window: WindowConfig,
    /// Signal processing parameters
    pub features: FeatureConfig,
}

/// One feature row per window
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    data: Array2<f64>,
}

impl FeatureMatrix {
    /// Wrap an existing `windows × features` array
    pub fn new(data: Array2<f64>) -> Self {
        Self { data }
    }

    /// Stack feature vectors as rows; every vector must have the assembled width
    pub fn from_vectors(vectors: &[FeatureVector]) -> Result<Self, FeatureError> {
        let mut data = Array2::zeros((vectors.len(), FEATURE_DIMENSION));
        for (mut row, vector) in data.axis_iter_mut(Axis(0)).zip(vectors) {
            if vector.len() != FEATURE_DIMENSION {
                return Err(FeatureError::ShapeMismatch {
                    expected: FEATURE_DIMENSION,
                    actual: vector.len(),
                });
            }
            row.assign(&ArrayView1::from(&vector.values[..]));
        }
        Ok(Self { data })
    }

    /// Number of windows (rows)
    pub fn n_windows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of features per row
    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    /// Check if the matrix has no rows
    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    /// View one row
    pub fn row(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        (index < self.n_windows()).then(|| self.data.row(index))
    }

    /// Copy rows out as nested vectors
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.data.axis_iter(Axis(0)).map(|r| r.to_vec()).collect()
    }

    /// Borrow the underlying array
    pub fn as_array(&self) -> &Array2<f64> {
        &self.data
    }
}

/// Shared segmentation + feature extraction pipeline
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    config: PipelineConfig,
}

impl FeaturePipeline {
    /// Validate the configuration and build a pipeline
    pub fn new(config: PipelineConfig) -> Result<Self, FeatureError> {
        config.window.validate()?;
        let extractor = FeatureExtractor::new(config.features.clone())?;
        if config.window.window_size < extractor.min_window_len() {
            return Err(FeatureError::FilterUnderflow {
                required: extractor.min_window_len(),
                actual: config.window.window_size,
            });
        }
        Ok(Self { config })
    }

    /// Active configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Extract features for a single window
    pub fn extract_window(&self, window: &SensorWindow) -> Result<FeatureVector, FeatureError> {
        FeatureExtractor::new(self.config.features.clone())?.extract(window)
    }

    /// Segment a table and extract every window's features.
    ///
    /// Fails on the first window that cannot be processed; no partial matrix
    /// is returned.
    pub fn extract_matrix(&self, table: &SampleTable) -> Result<FeatureMatrix, FeatureError> {
        let started = Instant::now();
        let windows: Vec<SensorWindow> = segment(table, &self.config.window)?.collect();

        let features = &self.config.features;
        let vectors = windows
            .par_iter()
            .map_init(
                || FeatureExtractor::new(features.clone()),
                |extractor, window| match extractor {
                    Ok(extractor) => extractor.extract(window),
                    Err(e) => Err(e.clone()),
                },
            )
            .collect::<Result<Vec<_>, _>>()?;

        let matrix = FeatureMatrix::from_vectors(&vectors)?;
        debug!(
            "Extracted {} x {} feature matrix from {} samples in {:?}",
            matrix.n_windows(),
            matrix.width(),
            table.len(),
            started.elapsed()
        );
        Ok(matrix)
    }
}
