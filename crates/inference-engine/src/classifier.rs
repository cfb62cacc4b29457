//! Scaler and Classifiers

use crate::artifact::{ClassifierSpec, ScalerParams};

/// Trained classifier over standardized feature rows
pub trait Classifier: Send + Sync {
    /// Input width
    fn n_features(&self) -> usize;

    /// Number of outputs
    fn n_classes(&self) -> usize;

    /// Output index of the predicted class
    fn predict(&self, row: &[f64]) -> usize;

    /// Per-output probabilities, when the model provides them
    fn predict_proba(&self, row: &[f64]) -> Option<Vec<f64>>;
}

/// Per-feature `(x − mean) / scale` transform
#[derive(Debug, Clone)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Build from trained parameters; zero or non-finite scales act as 1
    pub fn new(params: &ScalerParams) -> Self {
        let scale = params
            .scale
            .iter()
            .map(|&s| if s == 0.0 || !s.is_finite() { 1.0 } else { s })
            .collect();
        Self {
            mean: params.mean.clone(),
            scale,
        }
    }

    /// Input width
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Standardize a row in place
    pub fn transform(&self, row: &mut [f64]) {
        for ((x, m), s) in row.iter_mut().zip(&self.mean).zip(&self.scale) {
            *x = (*x - m) / s;
        }
    }
}

/// Linear decision functions with softmax (or logistic, for one row) probabilities
#[derive(Debug, Clone)]
pub struct LinearClassifier {
    coefficients: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
}

impl LinearClassifier {
    pub fn new(coefficients: Vec<Vec<f64>>, intercepts: Vec<f64>) -> Self {
        Self {
            coefficients,
            intercepts,
        }
    }

    fn decision(&self, row: &[f64]) -> Vec<f64> {
        self.coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(w, b)| w.iter().zip(row).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect()
    }
}

impl Classifier for LinearClassifier {
    fn n_features(&self) -> usize {
        self.coefficients.first().map_or(0, Vec::len)
    }

    fn n_classes(&self) -> usize {
        match self.coefficients.len() {
            1 => 2,
            n => n,
        }
    }

    fn predict(&self, row: &[f64]) -> usize {
        let scores = self.decision(row);
        if scores.len() == 1 {
            return usize::from(scores[0] > 0.0);
        }
        argmax(&scores)
    }

    fn predict_proba(&self, row: &[f64]) -> Option<Vec<f64>> {
        let scores = self.decision(row);
        if scores.len() == 1 {
            let p = 1.0 / (1.0 + (-scores[0]).exp());
            return Some(vec![1.0 - p, p]);
        }
        let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exp: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
        let total: f64 = exp.iter().sum();
        Some(exp.iter().map(|e| e / total).collect())
    }
}

/// Assigns the class whose centroid is nearest in Euclidean distance
#[derive(Debug, Clone)]
pub struct NearestCentroid {
    centroids: Vec<Vec<f64>>,
}

impl NearestCentroid {
    pub fn new(centroids: Vec<Vec<f64>>) -> Self {
        Self { centroids }
    }
}

impl Classifier for NearestCentroid {
    fn n_features(&self) -> usize {
        self.centroids.first().map_or(0, Vec::len)
    }

    fn n_classes(&self) -> usize {
        self.centroids.len()
    }

    fn predict(&self, row: &[f64]) -> usize {
        let distances: Vec<f64> = self
            .centroids
            .iter()
            .map(|c| -c.iter().zip(row).map(|(c, x)| (c - x) * (c - x)).sum::<f64>())
            .collect();
        argmax(&distances)
    }

    fn predict_proba(&self, _row: &[f64]) -> Option<Vec<f64>> {
        None
    }
}

impl ClassifierSpec {
    /// Instantiate the classifier these parameters describe
    pub fn build(&self) -> Box<dyn Classifier> {
        match self {
            ClassifierSpec::Linear {
                coefficients,
                intercepts,
            } => Box::new(LinearClassifier::new(coefficients.clone(), intercepts.clone())),
            ClassifierSpec::NearestCentroid { centroids } => {
                Box::new(NearestCentroid::new(centroids.clone()))
            }
        }
    }
}

/// Index of the first maximum
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}
