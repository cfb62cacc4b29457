//! Inference Engine Implementation

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use feature_engine::{sanitize, FeatureMatrix};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::artifact::ModelArtifact;
use crate::classifier::{Classifier, StandardScaler};
use crate::InferenceError;

/// Prediction for a single window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Row of the feature matrix
    pub window_index: usize,
    /// Predicted class id
    pub class_id: usize,
    /// Activity name of the class
    pub activity: String,
    /// Per-output probabilities, when the classifier provides them
    pub probabilities: Option<Vec<f64>>,
}

/// Result of inference over a whole recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResult {
    /// One prediction per window, in window order
    pub predictions: Vec<Prediction>,
    /// Most frequent activity; ties go to the one predicted first
    pub activity: String,
    /// Highest averaged class probability, 0.0 without probabilities
    pub confidence: f64,
    /// Averaged probability per activity
    pub probabilities: Option<BTreeMap<String, f64>>,
    /// Window count per predicted activity
    pub distribution: BTreeMap<String, usize>,
    /// Inference latency in milliseconds
    pub latency_ms: u64,
}

impl InferenceResult {
    /// Activity names per window, in window order
    pub fn activities(&self) -> Vec<String> {
        self.predictions.iter().map(|p| p.activity.clone()).collect()
    }
}

/// Standardize-then-classify engine over a shared model artifact
pub struct InferenceEngine {
    artifact: Arc<ModelArtifact>,
    scaler: StandardScaler,
    classifier: Box<dyn Classifier>,
}

impl InferenceEngine {
    /// Create a new inference engine
    pub fn new(artifact: Arc<ModelArtifact>) -> Result<Self, InferenceError> {
        artifact.validate()?;
        let scaler = StandardScaler::new(&artifact.scaler);
        let classifier = artifact.classifier.build();
        info!(
            "Inference engine ready: {} features, {} classes",
            scaler.n_features(),
            classifier.n_classes()
        );
        Ok(Self {
            artifact,
            scaler,
            classifier,
        })
    }

    /// Load an artifact from disk and build an engine around it
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InferenceError> {
        Self::new(Arc::new(ModelArtifact::load(path)?))
    }

    /// Shared artifact handle
    pub fn artifact(&self) -> &Arc<ModelArtifact> {
        &self.artifact
    }

    /// Feature width the model expects
    pub fn expected_features(&self) -> usize {
        self.scaler.n_features()
    }

    /// Class id to activity name map
    pub fn activities(&self) -> &BTreeMap<usize, String> {
        &self.artifact.labels
    }

    /// Classify every row of a feature matrix and summarize
    pub fn predict(&self, features: &FeatureMatrix) -> Result<InferenceResult, InferenceError> {
        let start = Instant::now();

        let expected = self.expected_features();
        if features.width() != expected {
            return Err(InferenceError::InvalidInputShape {
                expected,
                actual: features.width(),
            });
        }
        if features.is_empty() {
            return Err(InferenceError::InferenceFailed(
                "feature matrix has no windows".to_string(),
            ));
        }

        let predictions: Vec<Prediction> = features
            .to_rows()
            .into_iter()
            .enumerate()
            .map(|(window_index, mut row)| {
                sanitize(&mut row);
                self.scaler.transform(&mut row);
                let class_id = self.artifact.class_id(self.classifier.predict(&row));
                Prediction {
                    window_index,
                    class_id,
                    activity: self.artifact.label(class_id),
                    probabilities: self.classifier.predict_proba(&row),
                }
            })
            .collect();

        let mut distribution = BTreeMap::new();
        let mut first_seen: Vec<&str> = Vec::new();
        for p in &predictions {
            let count = distribution.entry(p.activity.clone()).or_insert(0usize);
            if *count == 0 {
                first_seen.push(&p.activity);
            }
            *count += 1;
        }
        // First activity to reach the top count in first-seen order
        let mut activity = String::new();
        let mut best = 0;
        for name in first_seen {
            let count = distribution.get(name).copied().unwrap_or(0);
            if count > best {
                best = count;
                activity = name.to_string();
            }
        }

        let (probabilities, confidence) = self.average_probabilities(&predictions);

        let latency_ms = start.elapsed().as_millis() as u64;
        debug!(
            "Classified {} windows in {}ms: {} ({:.3})",
            predictions.len(),
            latency_ms,
            activity,
            confidence
        );

        Ok(InferenceResult {
            predictions,
            activity,
            confidence,
            probabilities,
            distribution,
            latency_ms,
        })
    }

    /// Mean probability per activity and the largest mean
    fn average_probabilities(
        &self,
        predictions: &[Prediction],
    ) -> (Option<BTreeMap<String, f64>>, f64) {
        let rows: Option<Vec<&Vec<f64>>> =
            predictions.iter().map(|p| p.probabilities.as_ref()).collect();
        let rows = match rows {
            Some(rows) if !rows.is_empty() => rows,
            _ => return (None, 0.0),
        };

        let n_classes = self.classifier.n_classes();
        let mut mean = vec![0.0; n_classes];
        for row in &rows {
            for (m, p) in mean.iter_mut().zip(row.iter()) {
                *m += p;
            }
        }
        for m in mean.iter_mut() {
            *m /= rows.len() as f64;
        }

        let confidence = mean.iter().cloned().fold(0.0, f64::max);
        let by_label = mean
            .iter()
            .enumerate()
            .map(|(i, &p)| (self.artifact.label(self.artifact.class_id(i)), p))
            .collect();
        (Some(by_label), confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{ClassifierSpec, ScalerParams};
    use feature_engine::FEATURE_DIMENSION;
    use ndarray::Array2;

    /// Three classes separated by the sign pattern of the first two features
    fn linear_artifact(width: usize) -> ModelArtifact {
        let mut coefficients = vec![vec![0.0; width]; 3];
        coefficients[0][0] = 1.0;
        coefficients[1][1] = 1.0;
        ModelArtifact {
            name: "test".to_string(),
            scaler: ScalerParams {
                mean: vec![0.0; width],
                scale: vec![1.0; width],
            },
            classifier: ClassifierSpec::Linear {
                coefficients,
                intercepts: vec![0.0, 0.0, 0.5],
            },
            classes: Some(vec![1, 2, 3]),
            labels: [(1, "WALKING"), (2, "SITTING")]
                .into_iter()
                .map(|(k, v)| (k, v.to_string()))
                .collect(),
        }
    }

    fn matrix(rows: &[[f64; 2]], width: usize) -> FeatureMatrix {
        FeatureMatrix::new(Array2::from_shape_fn((rows.len(), width), |(i, j)| {
            if j < 2 {
                rows[i][j]
            } else {
                0.0
            }
        }))
    }

    #[test]
    fn test_predict_summary() {
        let engine = InferenceEngine::new(Arc::new(linear_artifact(FEATURE_DIMENSION))).unwrap();
        let features = matrix(
            &[[5.0, 0.0], [0.0, 5.0], [5.0, 0.0], [-5.0, -5.0]],
            FEATURE_DIMENSION,
        );
        let result = engine.predict(&features).unwrap();

        assert_eq!(
            result.activities(),
            vec!["WALKING", "SITTING", "WALKING", "Unknown_3"]
        );
        assert_eq!(result.activity, "WALKING");
        assert_eq!(result.distribution["WALKING"], 2);
        assert_eq!(result.distribution["Unknown_3"], 1);

        let probabilities = result.probabilities.unwrap();
        assert_eq!(probabilities.len(), 3);
        let total: f64 = probabilities.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!((result.confidence - probabilities["WALKING"]).abs() < 1e-12);
    }

    #[test]
    fn test_tie_goes_to_first_seen() {
        let engine = InferenceEngine::new(Arc::new(linear_artifact(4))).unwrap();
        let features = matrix(&[[0.0, 5.0], [5.0, 0.0], [5.0, 0.0], [0.0, 5.0]], 4);
        let result = engine.predict(&features).unwrap();
        assert_eq!(result.activity, "SITTING");
    }

    #[test]
    fn test_width_mismatch() {
        let engine = InferenceEngine::new(Arc::new(linear_artifact(FEATURE_DIMENSION))).unwrap();
        let features = matrix(&[[1.0, 0.0]], 100);
        assert!(matches!(
            engine.predict(&features),
            Err(InferenceError::InvalidInputShape {
                expected: 540,
                actual: 100
            })
        ));
    }

    #[test]
    fn test_empty_matrix() {
        let engine = InferenceEngine::new(Arc::new(linear_artifact(4))).unwrap();
        let features = FeatureMatrix::new(Array2::zeros((0, 4)));
        assert!(matches!(
            engine.predict(&features),
            Err(InferenceError::InferenceFailed(_))
        ));
    }

    #[test]
    fn test_nan_features_zeroed() {
        let engine = InferenceEngine::new(Arc::new(linear_artifact(4))).unwrap();
        let features = matrix(&[[f64::NAN, 5.0]], 4);
        let result = engine.predict(&features).unwrap();
        assert_eq!(result.activity, "SITTING");
        assert!(result.confidence.is_finite());
    }

    #[test]
    fn test_scaler_applied() {
        let mut artifact = linear_artifact(4);
        // Shift feature 0 so a raw value of 10 standardizes to 0
        artifact.scaler.mean[0] = 10.0;
        let engine = InferenceEngine::new(Arc::new(artifact)).unwrap();
        let result = engine.predict(&matrix(&[[10.0, 0.0]], 4)).unwrap();
        assert_eq!(result.predictions[0].class_id, 3);
    }

    #[test]
    fn test_centroid_has_no_probabilities() {
        let artifact = ModelArtifact {
            name: String::new(),
            scaler: ScalerParams {
                mean: vec![0.0; 2],
                scale: vec![1.0; 2],
            },
            classifier: ClassifierSpec::NearestCentroid {
                centroids: vec![vec![0.0, 0.0], vec![10.0, 10.0]],
            },
            classes: None,
            labels: [(0, "STANDING".to_string()), (1, "WALKING".to_string())]
                .into_iter()
                .collect(),
        };
        let engine = InferenceEngine::new(Arc::new(artifact)).unwrap();
        let result = engine.predict(&matrix(&[[9.0, 9.0], [1.0, 0.0], [8.0, 11.0]], 2)).unwrap();
        assert_eq!(result.activity, "WALKING");
        assert!(result.probabilities.is_none());
        assert_eq!(result.confidence, 0.0);
        assert_eq!(engine.activities().len(), 2);
    }

    #[test]
    fn test_invalid_artifact_rejected() {
        let mut artifact = linear_artifact(4);
        artifact.scaler.scale.pop();
        assert!(InferenceEngine::new(Arc::new(artifact)).is_err());
    }
}
