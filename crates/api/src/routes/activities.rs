//! Activity Label Routes

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

/// Response for activities endpoint
#[derive(Debug, Serialize)]
pub struct ActivitiesResponse {
    /// Class id to activity name
    pub activities: BTreeMap<usize, String>,
    /// Activity names in class id order
    pub available_activities: Vec<String>,
}

/// List the activities the loaded model can recognize
pub async fn get_activities(State(state): State<Arc<AppState>>) -> Json<ActivitiesResponse> {
    let activities = state
        .engine
        .as_ref()
        .map(|engine| engine.activities().clone())
        .unwrap_or_default();

    Json(ActivitiesResponse {
        available_activities: activities.values().cloned().collect(),
        activities,
    })
}
