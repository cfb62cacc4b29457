//! Model Artifact
//!
//! JSON description of a trained scaler + classifier pair and the label map
//! for its classes.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::InferenceError;

/// Per-feature standardization parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    /// Feature means subtracted before scaling
    pub mean: Vec<f64>,
    /// Feature standard deviations
    pub scale: Vec<f64>,
}

/// Trained classifier parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClassifierSpec {
    /// Multinomial logistic regression; a single coefficient row is a binary model
    Linear {
        coefficients: Vec<Vec<f64>>,
        intercepts: Vec<f64>,
    },
    /// Closest centroid in standardized feature space
    NearestCentroid { centroids: Vec<Vec<f64>> },
}

/// Trained model: scaler, classifier, class ids and their labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Free-form model name
    #[serde(default)]
    pub name: String,
    pub scaler: ScalerParams,
    pub classifier: ClassifierSpec,
    /// Class id of each classifier output, `0..n_classes` when absent
    #[serde(default)]
    pub classes: Option<Vec<usize>>,
    /// Activity name per class id
    #[serde(default)]
    pub labels: BTreeMap<usize, String>,
}

impl ModelArtifact {
    /// Read and validate an artifact file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            InferenceError::ModelLoadError(format!("{}: {}", path.display(), e))
        })?;
        let artifact = Self::from_json(&text)?;
        info!(
            "Loaded model {:?} from {}: {} features, {} classes",
            artifact.name,
            path.display(),
            artifact.n_features(),
            artifact.n_classes()
        );
        Ok(artifact)
    }

    /// Parse and validate an artifact from JSON text
    pub fn from_json(text: &str) -> Result<Self, InferenceError> {
        let artifact: Self = serde_json::from_str(text)
            .map_err(|e| InferenceError::ModelLoadError(e.to_string()))?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, InferenceError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| InferenceError::ModelLoadError(e.to_string()))
    }

    /// Check that scaler, classifier and classes agree with each other
    pub fn validate(&self) -> Result<(), InferenceError> {
        let width = self.scaler.mean.len();
        if width == 0 {
            return Err(InferenceError::ModelLoadError(
                "scaler has no features".to_string(),
            ));
        }
        if self.scaler.scale.len() != width {
            return Err(InferenceError::ModelLoadError(format!(
                "scaler mean has {} entries but scale has {}",
                width,
                self.scaler.scale.len()
            )));
        }

        let rows = match &self.classifier {
            ClassifierSpec::Linear {
                coefficients,
                intercepts,
            } => {
                if intercepts.len() != coefficients.len() {
                    return Err(InferenceError::ModelLoadError(format!(
                        "{} coefficient rows but {} intercepts",
                        coefficients.len(),
                        intercepts.len()
                    )));
                }
                coefficients
            }
            ClassifierSpec::NearestCentroid { centroids } => centroids,
        };
        if rows.is_empty() {
            return Err(InferenceError::ModelLoadError(
                "classifier has no classes".to_string(),
            ));
        }
        if let Some(row) = rows.iter().find(|r| r.len() != width) {
            return Err(InferenceError::ModelLoadError(format!(
                "classifier expects {} features, scaler has {}",
                row.len(),
                width
            )));
        }

        if let Some(classes) = &self.classes {
            if classes.len() != self.n_classes() {
                return Err(InferenceError::ModelLoadError(format!(
                    "{} class ids for {} classifier outputs",
                    classes.len(),
                    self.n_classes()
                )));
            }
        }
        Ok(())
    }

    /// Input width the model was trained on
    pub fn n_features(&self) -> usize {
        self.scaler.mean.len()
    }

    /// Number of classifier outputs
    pub fn n_classes(&self) -> usize {
        match &self.classifier {
            ClassifierSpec::Linear { coefficients, .. } if coefficients.len() == 1 => 2,
            ClassifierSpec::Linear { coefficients, .. } => coefficients.len(),
            ClassifierSpec::NearestCentroid { centroids } => centroids.len(),
        }
    }

    /// Class id of classifier output `index`
    pub fn class_id(&self, index: usize) -> usize {
        self.classes
            .as_ref()
            .and_then(|c| c.get(index).copied())
            .unwrap_or(index)
    }

    /// Activity name for a class id, `Unknown_<id>` when unmapped
    pub fn label(&self, class_id: usize) -> String {
        self.labels
            .get(&class_id)
            .cloned()
            .unwrap_or_else(|| format!("Unknown_{}", class_id))
    }
}
