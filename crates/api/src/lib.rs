//! Activity Recognition API Server
//!
//! Accepts uploaded IMU recordings, runs the feature pipeline and classifier,
//! and reports the recognized activity with signal previews.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use feature_engine::{FeaturePipeline, FEATURE_DIMENSION};
use inference_engine::{InferenceEngine, InferenceError};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sensor_ingest::UploadValidator;
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

mod error;
mod routes;
mod settings;

pub use error::ApiError;
pub use settings::{
    LimitSettings, LogSettings, ModelSettings, PipelineSettings, ServerSettings, Settings,
};

/// Headroom above the upload limit for multipart framing
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state shared across handlers
pub struct AppState {
    /// Loaded settings
    pub settings: Settings,
    /// Segmentation + feature extraction
    pub pipeline: FeaturePipeline,
    /// Classifier, absent when the model artifact failed to load
    pub engine: Option<InferenceEngine>,
    /// Upload checks
    pub validator: UploadValidator,
    /// Prometheus render handle
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state; a loaded model must accept the
    /// pipeline's feature width
    pub fn new(
        settings: Settings,
        engine: Option<InferenceEngine>,
        metrics: Option<PrometheusHandle>,
    ) -> Result<Self, ApiError> {
        if let Some(engine) = &engine {
            if engine.expected_features() != FEATURE_DIMENSION {
                return Err(ApiError::Inference(InferenceError::InvalidInputShape {
                    expected: engine.expected_features(),
                    actual: FEATURE_DIMENSION,
                }));
            }
        }
        let pipeline = FeaturePipeline::new(settings.pipeline.to_pipeline_config())?;
        let validator = UploadValidator::new(settings.limits.to_upload_limits());
        Ok(Self {
            settings,
            pipeline,
            engine,
            validator,
            metrics,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
        })
    }

    /// Build state from settings, loading the model artifact they point at
    pub fn from_settings(
        settings: Settings,
        metrics: Option<PrometheusHandle>,
    ) -> Result<Self, ApiError> {
        let engine = match InferenceEngine::load(&settings.model.path) {
            Ok(engine) => Some(engine),
            Err(e) => {
                warn!("Model not loaded from {}: {}", settings.model.path, e);
                None
            }
        };
        Self::new(settings, engine, metrics)
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub ok: bool,
    pub model_loaded: bool,
    pub version: String,
    pub uptime_seconds: u64,
    pub expected_features: usize,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.settings.limits.max_upload_bytes + MULTIPART_OVERHEAD;
    Router::new()
        .route("/", get(root_handler))
        .route("/api/health", get(health_handler))
        .route("/api/activities", get(routes::activities::get_activities))
        .route("/api/features", get(routes::features::get_features))
        .route("/api/predict", post(routes::predict::predict))
        .route("/metrics", get(metrics_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Service banner
async fn root_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "HAR API is running",
        "version": state.version,
    }))
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let expected_features = state
        .engine
        .as_ref()
        .map_or(FEATURE_DIMENSION, InferenceEngine::expected_features);

    Json(HealthResponse {
        status: "healthy".to_string(),
        ok: true,
        model_loaded: state.engine.is_some(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        expected_features,
    })
}

/// Prometheus text exposition
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state
        .metrics
        .as_ref()
        .map(PrometheusHandle::render)
        .unwrap_or_default();
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}

/// Install the global Prometheus recorder
pub fn init_metrics() -> Result<PrometheusHandle, ApiError> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ApiError::Internal(format!("metrics recorder: {}", e)))
}

/// Initialize logging
pub fn init_logging(log: &LogSettings) -> Result<(), ApiError> {
    let level = log.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let result = if log.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.map_err(|e| ApiError::Internal(format!("tracing subscriber: {}", e)))
}

/// Run the server until the listener fails
pub async fn run_server(settings: Settings) -> Result<(), ApiError> {
    let metrics = init_metrics()?;
    let addr = settings.server.addr.clone();
    let state = Arc::new(AppState::from_settings(settings, Some(metrics))?);
    let app = create_router(state);

    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ApiError::Internal(format!("bind {}: {}", addr, e)))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| ApiError::Internal(format!("server: {}", e)))?;

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use inference_engine::{ClassifierSpec, ModelArtifact, ScalerParams};

    /// Two-class model keyed on the mean of the accelerometer z axis
    pub fn artifact() -> ModelArtifact {
        let mut coefficients = vec![vec![0.0; FEATURE_DIMENSION]; 2];
        // Block 2 is tBodyAcc-Z (raw accelerometer z), feature 0 its mean
        coefficients[0][2 * feature_engine::BLOCK_FEATURES] = 1.0;
        coefficients[1][2 * feature_engine::BLOCK_FEATURES] = -1.0;
        ModelArtifact {
            name: "toy".to_string(),
            scaler: ScalerParams {
                mean: vec![5.0; FEATURE_DIMENSION],
                scale: vec![1.0; FEATURE_DIMENSION],
            },
            classifier: ClassifierSpec::Linear {
                coefficients,
                intercepts: vec![0.0, 0.0],
            },
            classes: Some(vec![4, 6]),
            labels: [(4, "SITTING"), (6, "LAYING")]
                .into_iter()
                .map(|(k, v)| (k, v.to_string()))
                .collect(),
        }
    }

    pub fn state(with_model: bool) -> Arc<AppState> {
        let engine = with_model
            .then(|| InferenceEngine::new(Arc::new(artifact())))
            .transpose()
            .unwrap();
        let metrics = PrometheusBuilder::new().build_recorder().handle();
        Arc::new(AppState::new(Settings::default(), engine, Some(metrics)).unwrap())
    }

    pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
