//! Feature Layout Routes

use std::sync::Arc;

use axum::{extract::State, Json};
use feature_engine::{feature_names, PipelineConfig};
use serde::Serialize;

use crate::AppState;

/// Response for features endpoint
#[derive(Debug, Serialize)]
pub struct FeaturesResponse {
    pub count: usize,
    /// Column names in assembly order
    pub names: Vec<String>,
    /// Active segmentation and signal processing settings
    pub pipeline: PipelineConfig,
}

/// Describe the feature vector layout
pub async fn get_features(State(state): State<Arc<AppState>>) -> Json<FeaturesResponse> {
    let names = feature_names();
    Json(FeaturesResponse {
        count: names.len(),
        names,
        pipeline: state.pipeline.config().clone(),
    })
}
