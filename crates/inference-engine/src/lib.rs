//! Activity Inference Engine
//!
//! Applies a trained standardization transform and classifier, loaded from a
//! JSON artifact, to feature matrices and summarizes per-window predictions.

mod artifact;
mod classifier;
mod engine;

pub use artifact::{ClassifierSpec, ModelArtifact, ScalerParams};
pub use classifier::{Classifier, LinearClassifier, NearestCentroid, StandardScaler};
pub use engine::{InferenceEngine, InferenceResult, Prediction};

use thiserror::Error;

/// Errors during inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid input shape: expected {expected} features, got {actual}")]
    InvalidInputShape { expected: usize, actual: usize },
}
