//! Feature Vector Assembly
//!
//! Every triaxial slot contributes one block per axis, then every magnitude
//! slot contributes one block. A block is the time-domain features directly
//! followed by the frequency-domain features. The column order is part of the
//! contract with the trained scaler and classifier.

use sensor_window::{SensorWindow, SpatialAxis};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::fft::{FftAnalyzer, FREQ_DOMAIN_FEATURES, SPECTRAL_FEATURE_NAMES};
use crate::signals::SignalGenerator;
use crate::statistics::{StatisticalFeatures, TIME_DOMAIN_FEATURES, TIME_FEATURE_NAMES};
use crate::{sanitize, FeatureError};

/// Values produced per scalar signal
pub const BLOCK_FEATURES: usize = TIME_DOMAIN_FEATURES + FREQ_DOMAIN_FEATURES;

/// Length of an assembled feature vector (5 signals × 3 axes + 5 magnitudes)
pub const FEATURE_DIMENSION: usize =
    (SignalKind::ALL.len() * 3 + SignalKind::ALL.len()) * BLOCK_FEATURES;

/// Accelerometer signal that fills the body-acceleration slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodySource {
    /// Accelerometer as recorded, gravity included
    #[default]
    Total,
    /// Accelerometer with the low-passed gravity subtracted
    GravityRemoved,
}

/// Feature extraction configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Sampling frequency (Hz)
    pub sample_rate: f64,
    /// Gravity low-pass cutoff (Hz)
    pub gravity_cutoff_hz: f64,
    /// Butterworth order of the gravity filter
    pub filter_order: usize,
    /// Signal behind the body-acceleration slots
    pub body_source: BodySource,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 50.0,
            gravity_cutoff_hz: 0.3,
            filter_order: 4,
            body_source: BodySource::Total,
        }
    }
}

/// Triaxial signal slots, in assembly order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    BodyAcc,
    GravityAcc,
    BodyAccJerk,
    BodyGyro,
    BodyGyroJerk,
}

impl SignalKind {
    /// All slots in assembly order
    pub const ALL: [SignalKind; 5] = [
        SignalKind::BodyAcc,
        SignalKind::GravityAcc,
        SignalKind::BodyAccJerk,
        SignalKind::BodyGyro,
        SignalKind::BodyGyroJerk,
    ];

    /// Column prefix of the triaxial slot
    pub fn name(&self) -> &'static str {
        match self {
            SignalKind::BodyAcc => "tBodyAcc",
            SignalKind::GravityAcc => "tGravityAcc",
            SignalKind::BodyAccJerk => "tBodyAccJerk",
            SignalKind::BodyGyro => "tBodyGyro",
            SignalKind::BodyGyroJerk => "tBodyGyroJerk",
        }
    }

    /// Column prefix of the magnitude slot
    pub fn magnitude_name(&self) -> &'static str {
        match self {
            SignalKind::BodyAcc => "tBodyAccMag",
            SignalKind::GravityAcc => "tGravityAccMag",
            SignalKind::BodyAccJerk => "tBodyAccJerkMag",
            SignalKind::BodyGyro => "tBodyGyroMag",
            SignalKind::BodyGyroJerk => "tBodyGyroJerkMag",
        }
    }
}

/// Column names of an assembled vector, in order
pub fn feature_names() -> Vec<String> {
    let suffixes: Vec<&str> = TIME_FEATURE_NAMES
        .iter()
        .chain(SPECTRAL_FEATURE_NAMES.iter())
        .copied()
        .collect();

    let mut names = Vec::with_capacity(FEATURE_DIMENSION);
    for kind in SignalKind::ALL {
        for axis in SpatialAxis::ALL {
            for suffix in &suffixes {
                names.push(format!("{}-{}.{}", kind.name(), axis.as_str(), suffix));
            }
        }
    }
    for kind in SignalKind::ALL {
        for suffix in &suffixes {
            names.push(format!("{}.{}", kind.magnitude_name(), suffix));
        }
    }
    names
}

/// Feature vector for ML inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Index of the source window
    pub window_index: usize,
    /// Feature values in assembly order
    pub values: Vec<f64>,
}

impl FeatureVector {
    /// Compact binary encoding
    pub fn to_bytes(&self) -> Result<Vec<u8>, FeatureError> {
        postcard::to_allocvec(self).map_err(|e| FeatureError::Encoding(e.to_string()))
    }

    /// Decode from [`FeatureVector::to_bytes`] output
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FeatureError> {
        postcard::from_bytes(bytes).map_err(|e| FeatureError::Encoding(e.to_string()))
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the vector holds no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Feature extractor that turns sensor windows into feature vectors
pub struct FeatureExtractor {
    config: FeatureConfig,
    generator: SignalGenerator,
    fft_analyzer: FftAnalyzer,
}

impl FeatureExtractor {
    /// Create a new feature extractor
    pub fn new(config: FeatureConfig) -> Result<Self, FeatureError> {
        let generator = SignalGenerator::new(&config)?;
        Ok(Self {
            fft_analyzer: FftAnalyzer::new(config.sample_rate),
            generator,
            config,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Shortest window that can be processed
    pub fn min_window_len(&self) -> usize {
        self.generator.min_window_len()
    }

    /// Time- and frequency-domain block of one scalar signal
    pub fn feature_block(&mut self, signal: &[f64]) -> [f64; BLOCK_FEATURES] {
        let time = StatisticalFeatures::compute(signal).to_array();
        let freq = self.fft_analyzer.analyze(signal).to_array();

        let mut block = [0.0; BLOCK_FEATURES];
        block[..TIME_DOMAIN_FEATURES].copy_from_slice(&time);
        block[TIME_DOMAIN_FEATURES..].copy_from_slice(&freq);
        block
    }

    /// Extract the full feature vector of a window
    pub fn extract(&mut self, window: &SensorWindow) -> Result<FeatureVector, FeatureError> {
        let derived = self.generator.derive(window)?;

        let mut values = Vec::with_capacity(FEATURE_DIMENSION);
        for kind in SignalKind::ALL {
            let signal = derived.signal(kind);
            for axis in SpatialAxis::ALL {
                let block = self.feature_block(&signal.axis_values(axis));
                values.extend_from_slice(&block);
            }
        }
        for kind in SignalKind::ALL {
            let block = self.feature_block(&derived.magnitude(kind));
            values.extend_from_slice(&block);
        }

        if values.len() != FEATURE_DIMENSION {
            return Err(FeatureError::ShapeMismatch {
                expected: FEATURE_DIMENSION,
                actual: values.len(),
            });
        }
        sanitize(&mut values);

        trace!(
            "Extracted {} features from window {} (start {})",
            values.len(),
            window.index,
            window.start
        );

        Ok(FeatureVector {
            window_index: window.index,
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sensor_window::TriaxialSignal;

    fn make_window(rows: &[[f64; 6]]) -> SensorWindow {
        let accel: Vec<[f64; 3]> = rows.iter().map(|r| [r[0], r[1], r[2]]).collect();
        let gyro: Vec<[f64; 3]> = rows.iter().map(|r| [r[3], r[4], r[5]]).collect();
        SensorWindow::new(
            0,
            0,
            TriaxialSignal::from_rows(&accel),
            TriaxialSignal::from_rows(&gyro),
        )
        .unwrap()
    }

    fn walking_window(n: usize) -> SensorWindow {
        let rows: Vec<[f64; 6]> = (0..n)
            .map(|i| {
                let t = i as f64 / 50.0;
                [
                    0.8 * (2.0 * std::f64::consts::PI * 1.8 * t).sin(),
                    0.3 * (2.0 * std::f64::consts::PI * 3.6 * t).cos(),
                    9.81 + 0.5 * (2.0 * std::f64::consts::PI * 1.8 * t).sin(),
                    0.2 * (2.0 * std::f64::consts::PI * 0.9 * t).sin(),
                    0.1 * t,
                    -0.05,
                ]
            })
            .collect();
        make_window(&rows)
    }

    #[test]
    fn test_dimension_constants() {
        assert_eq!(BLOCK_FEATURES, 27);
        assert_eq!(FEATURE_DIMENSION, 540);
    }

    #[test]
    fn test_feature_names() {
        let names = feature_names();
        assert_eq!(names.len(), FEATURE_DIMENSION);
        assert_eq!(names[0], "tBodyAcc-X.mean");
        assert_eq!(names[15], "tBodyAcc-X.fft.meanFreq");
        assert_eq!(names[27], "tBodyAcc-Y.mean");
        assert_eq!(names[3 * 27], "tGravityAcc-X.mean");
        assert_eq!(names[15 * 27], "tBodyAccMag.mean");
        assert_eq!(names[539], "tBodyGyroJerkMag.fft.bandEnergy8");
    }

    #[test]
    fn test_feature_extraction() {
        let mut extractor = FeatureExtractor::new(FeatureConfig::default()).unwrap();
        let vector = extractor.extract(&walking_window(128)).unwrap();
        assert_eq!(vector.len(), FEATURE_DIMENSION);
        assert!(vector.values.iter().all(|v| v.is_finite()));
        // tBodyAcc-Z.mean is fed by the raw signal, so gravity is still in it
        assert!((vector.values[2 * 27] - 9.81).abs() < 0.1);
    }

    #[test]
    fn test_constant_window() {
        let mut extractor = FeatureExtractor::new(FeatureConfig::default()).unwrap();
        let vector = extractor
            .extract(&make_window(&[[0.0, 0.0, 9.81, 0.0, 0.0, 0.0]; 128]))
            .unwrap();
        assert_eq!(vector.len(), FEATURE_DIMENSION);
        // tBodyAcc-Z is constant: a 15-zero time-domain block
        let start = 2 * BLOCK_FEATURES;
        assert!(vector.values[start..start + TIME_DOMAIN_FEATURES]
            .iter()
            .all(|&v| v == 0.0));
        // Gyroscope is all zero: both domains vanish
        let gyro = 9 * BLOCK_FEATURES;
        assert!(vector.values[gyro..gyro + BLOCK_FEATURES]
            .iter()
            .all(|&v| v == 0.0));
    }

    #[test]
    fn test_feature_block() {
        let mut extractor = FeatureExtractor::new(FeatureConfig::default()).unwrap();
        let block = extractor.feature_block(&[1.0; 64]);
        assert_eq!(&block[..TIME_DOMAIN_FEATURES], &[0.0; TIME_DOMAIN_FEATURES]);
        // A constant offset still has DC power
        assert!(block[TIME_DOMAIN_FEATURES + 4] > 0.0);
    }

    #[test]
    fn test_non_finite_samples() {
        let mut rows = vec![[0.1, -0.2, 9.8, 0.01, 0.02, 0.03]; 128];
        rows[10][0] = f64::NAN;
        rows[50][4] = f64::INFINITY;
        rows[90][2] = f64::NEG_INFINITY;
        let mut extractor = FeatureExtractor::new(FeatureConfig::default()).unwrap();
        let vector = extractor.extract(&make_window(&rows)).unwrap();
        assert!(vector.values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_spike_window() {
        let mut rows = vec![[0.0; 6]; 128];
        rows[64] = [50.0, -50.0, 50.0, 10.0, -10.0, 10.0];
        let mut extractor = FeatureExtractor::new(FeatureConfig::default()).unwrap();
        let vector = extractor.extract(&make_window(&rows)).unwrap();
        assert!(vector.values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_deterministic_bytes() {
        let window = walking_window(128);
        let mut first = FeatureExtractor::new(FeatureConfig::default()).unwrap();
        let mut second = FeatureExtractor::new(FeatureConfig::default()).unwrap();
        let a = first.extract(&window).unwrap().to_bytes().unwrap();
        let b = second.extract(&window).unwrap().to_bytes().unwrap();
        assert_eq!(a, b);
        assert_eq!(FeatureVector::from_bytes(&a).unwrap().len(), FEATURE_DIMENSION);
    }

    #[test]
    fn test_gravity_removed_body_slot() {
        let config = FeatureConfig {
            body_source: BodySource::GravityRemoved,
            ..Default::default()
        };
        let mut extractor = FeatureExtractor::new(config).unwrap();
        let vector = extractor.extract(&walking_window(128)).unwrap();
        // The gravity offset is gone from the body slot
        assert!(vector.values[2 * 27].abs() < 1.0);
    }

    #[test]
    fn test_short_window_rejected() {
        let mut extractor = FeatureExtractor::new(FeatureConfig::default()).unwrap();
        assert_eq!(extractor.min_window_len(), 16);
        assert!(matches!(
            extractor.extract(&walking_window(15)),
            Err(FeatureError::FilterUnderflow { required: 16, actual: 15 })
        ));
        assert!(extractor.extract(&walking_window(16)).is_ok());
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: FeatureConfig =
            serde_json::from_str(r#"{"body_source": "gravity_removed"}"#).unwrap();
        assert_eq!(config.sample_rate, 50.0);
        assert_eq!(config.body_source, BodySource::GravityRemoved);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_dimension_is_stable(
            len in 16usize..300,
            seed in proptest::collection::vec(-20.0f64..20.0, 6),
        ) {
            let rows: Vec<[f64; 6]> = (0..len)
                .map(|i| {
                    let t = i as f64;
                    let mut row = [0.0; 6];
                    for (c, v) in row.iter_mut().enumerate() {
                        *v = seed[c] * (0.05 * (c + 1) as f64 * t).sin() + seed[(c + 1) % 6];
                    }
                    row
                })
                .collect();
            let mut extractor = FeatureExtractor::new(FeatureConfig::default()).unwrap();
            let vector = extractor.extract(&make_window(&rows)).unwrap();
            prop_assert_eq!(vector.len(), FEATURE_DIMENSION);
            prop_assert!(vector.values.iter().all(|v| v.is_finite()));
        }
    }
}
