//! Feature Engineering Engine
//!
//! Turns windows of raw accelerometer/gyroscope samples into fixed-length
//! feature vectors: derived signals (gravity, body, jerk, magnitude), 15
//! time-domain and 12 frequency-domain descriptors per scalar signal, and a
//! fixed assembly order shared with the classifier.

mod features;
mod fft;
mod filter;
mod linalg;
mod pipeline;
mod signals;
mod statistics;

pub use features::{
    feature_names, BodySource, FeatureConfig, FeatureExtractor, FeatureVector, SignalKind,
    BLOCK_FEATURES, FEATURE_DIMENSION,
};
pub use fft::{FftAnalyzer, SpectralFeatures, FREQ_DOMAIN_FEATURES, SPECTRAL_BANDS};
pub use filter::ButterworthLowPass;
pub use pipeline::{FeatureMatrix, FeaturePipeline, PipelineConfig};
pub use signals::{gradient, DerivedSignals, SignalGenerator};
pub use statistics::{StatisticalFeatures, AR_ORDER, ENTROPY_BINS, TIME_DOMAIN_FEATURES};

use sensor_window::WindowError;
use thiserror::Error;
use tracing::trace;

/// Errors during feature extraction
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    #[error("Filter underflow: need at least {required} samples, got {actual}")]
    FilterUnderflow { required: usize, actual: usize },
    #[error("Invalid filter design: {0}")]
    InvalidFilter(String),
    #[error("Feature width mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error(transparent)]
    Window(#[from] WindowError),
    #[error("Feature encoding failed: {0}")]
    Encoding(String),
}

/// Replace every NaN/infinite value with 0.0, returning how many were replaced
pub fn sanitize(values: &mut [f64]) -> usize {
    let mut replaced = 0;
    for v in values.iter_mut().filter(|v| !v.is_finite()) {
        *v = 0.0;
        replaced += 1;
    }
    if replaced > 0 {
        trace!("Replaced {} non-finite feature values", replaced);
    }
    replaced
}
