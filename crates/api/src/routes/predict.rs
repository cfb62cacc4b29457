//! Activity Prediction Route
//!
//! Accepts a multipart upload (field `file`), runs ingestion, feature
//! extraction and classification on a blocking thread, and returns the
//! recognized activity with previews of the raw signals and their spectra.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Multipart, State},
    Json,
};
use feature_engine::FftAnalyzer;
use metrics::{counter, histogram};
use sensor_window::SampleTable;
use serde::Serialize;
use tracing::{debug, info};

use crate::{ApiError, AppState};

/// Multipart field carrying the recording
pub const FILE_FIELD: &str = "file";

/// Request metadata
#[derive(Debug, Serialize)]
pub struct PredictMeta {
    pub samples: usize,
    pub channels: usize,
    pub sampling_rate: f64,
    pub windows_analyzed: usize,
    pub filename: String,
}

/// Leading samples of every sensor channel, with a time axis in seconds
#[derive(Debug, Serialize)]
pub struct SignalsPreview {
    pub t: Vec<f64>,
    pub acc_x: Vec<f64>,
    pub acc_y: Vec<f64>,
    pub acc_z: Vec<f64>,
    pub gyro_x: Vec<f64>,
    pub gyro_y: Vec<f64>,
    pub gyro_z: Vec<f64>,
}

impl SignalsPreview {
    fn from_table(table: &SampleTable, samples: usize, sample_rate: f64) -> Self {
        let n = samples.min(table.len());
        Self {
            t: (0..n).map(|i| i as f64 / sample_rate).collect(),
            acc_x: table.column_head(0, n),
            acc_y: table.column_head(1, n),
            acc_z: table.column_head(2, n),
            gyro_x: table.column_head(3, n),
            gyro_y: table.column_head(4, n),
            gyro_z: table.column_head(5, n),
        }
    }
}

/// Hann-windowed magnitude spectra of the previewed accelerometer axes
#[derive(Debug, Serialize)]
pub struct FftPreview {
    pub freq: Vec<f64>,
    pub mag_acc_x: Vec<f64>,
    pub mag_acc_y: Vec<f64>,
    pub mag_acc_z: Vec<f64>,
}

impl FftPreview {
    fn from_signals(signals: &SignalsPreview, sample_rate: f64) -> Self {
        let mut analyzer = FftAnalyzer::new(sample_rate);
        Self {
            freq: analyzer.frequencies(signals.acc_x.len()),
            mag_acc_x: analyzer.magnitude_spectrum(&signals.acc_x),
            mag_acc_y: analyzer.magnitude_spectrum(&signals.acc_y),
            mag_acc_z: analyzer.magnitude_spectrum(&signals.acc_z),
        }
    }
}

/// Response for predict endpoint
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub activity: String,
    pub confidence: f64,
    pub probabilities: Option<BTreeMap<String, f64>>,
    pub meta: PredictMeta,
    pub signals_preview: SignalsPreview,
    pub fft_preview: FftPreview,
    pub all_predictions: Vec<String>,
    pub prediction_distribution: BTreeMap<String, usize>,
}

/// Classify an uploaded recording
pub async fn predict(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<PredictResponse>, ApiError> {
    let started = Instant::now();
    let result = handle(state, multipart).await;

    let outcome = if result.is_ok() { "ok" } else { "error" };
    counter!("har_predict_requests_total", "outcome" => outcome).increment(1);
    histogram!("har_predict_duration_seconds").record(started.elapsed().as_secs_f64());

    result.map(Json)
}

async fn handle(state: Arc<AppState>, mut multipart: Multipart) -> Result<PredictResponse, ApiError> {
    let (filename, contents) = read_upload(&mut multipart).await?;
    debug!("Received {} ({} bytes)", filename, contents.len());

    tokio::task::spawn_blocking(move || analyze(&state, &filename, &contents))
        .await
        .map_err(|e| ApiError::Internal(format!("prediction task: {}", e)))?
}

/// File name and bytes of the `file` field
async fn read_upload(multipart: &mut Multipart) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let contents = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
        return Ok((filename, contents.to_vec()));
    }
    Err(ApiError::BadRequest(format!(
        "Missing multipart field {:?}",
        FILE_FIELD
    )))
}

/// Ingest, extract and classify; runs off the async executor
fn analyze(state: &AppState, filename: &str, contents: &[u8]) -> Result<PredictResponse, ApiError> {
    let pipeline_started = Instant::now();

    let table = state.validator.ingest(filename, contents)?;
    let engine = state.engine.as_ref().ok_or(ApiError::ModelUnavailable)?;
    let matrix = state.pipeline.extract_matrix(&table)?;
    let result = engine.predict(&matrix)?;

    histogram!("har_pipeline_duration_seconds").record(pipeline_started.elapsed().as_secs_f64());
    counter!("har_windows_processed_total").increment(matrix.n_windows() as u64);

    let sample_rate = state.pipeline.config().features.sample_rate;
    let signals_preview =
        SignalsPreview::from_table(&table, state.settings.server.preview_samples, sample_rate);
    let fft_preview = FftPreview::from_signals(&signals_preview, sample_rate);

    info!(
        "Predicted {} ({:.3}) for {}: {} samples, {} windows",
        result.activity,
        result.confidence,
        filename,
        table.len(),
        matrix.n_windows()
    );

    Ok(PredictResponse {
        all_predictions: result.activities(),
        activity: result.activity,
        confidence: result.confidence,
        probabilities: result.probabilities,
        meta: PredictMeta {
            samples: table.len(),
            channels: table.columns(),
            sampling_rate: sample_rate,
            windows_analyzed: matrix.n_windows(),
            filename: filename.to_string(),
        },
        signals_preview,
        fft_preview,
        prediction_distribution: result.distribution,
    })
}
