//! Service Settings
//!
//! Settings are layered: built-in defaults, then an optional `config/har.toml`,
//! then `HAR__SECTION__KEY` environment variables.

use config::{Config, ConfigError, Environment, File};
use feature_engine::{BodySource, FeatureConfig, PipelineConfig};
use sensor_ingest::UploadLimits;
use sensor_window::WindowConfig;
use serde::{Deserialize, Serialize};

/// Default configuration file, relative to the working directory
pub const CONFIG_FILE: &str = "config/har";

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "HAR";

/// Top-level service settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub model: ModelSettings,
    pub pipeline: PipelineSettings,
    pub limits: LimitSettings,
    pub log: LogSettings,
}

/// Listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Socket address to bind
    pub addr: String,
    /// Samples included in signal and spectrum previews
    pub preview_samples: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8030".to_string(),
            preview_samples: 256,
        }
    }
}

/// Model artifact location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub path: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            path: "models/har_model.json".to_string(),
        }
    }
}

/// Flat pipeline parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub window_size: usize,
    pub overlap: usize,
    pub sample_rate: f64,
    pub gravity_cutoff_hz: f64,
    pub filter_order: usize,
    pub body_source: BodySource,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        let window = WindowConfig::default();
        let features = FeatureConfig::default();
        Self {
            window_size: window.window_size,
            overlap: window.overlap,
            sample_rate: features.sample_rate,
            gravity_cutoff_hz: features.gravity_cutoff_hz,
            filter_order: features.filter_order,
            body_source: features.body_source,
        }
    }
}

impl PipelineSettings {
    /// Nested configuration understood by the feature pipeline
    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            window: WindowConfig {
                window_size: self.window_size,
                overlap: self.overlap,
            },
            features: FeatureConfig {
                sample_rate: self.sample_rate,
                gravity_cutoff_hz: self.gravity_cutoff_hz,
                filter_order: self.filter_order,
                body_source: self.body_source,
            },
        }
    }
}

/// Upload limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitSettings {
    pub max_upload_bytes: usize,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            max_upload_bytes: UploadLimits::default().max_bytes,
        }
    }
}

impl LimitSettings {
    pub fn to_upload_limits(&self) -> UploadLimits {
        UploadLimits {
            max_bytes: self.max_upload_bytes,
            ..Default::default()
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Maximum level: trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Settings {
    /// Load from the default file (if present) and the environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_builder(
            Config::builder()
                .add_source(File::with_name(CONFIG_FILE).required(false))
                .add_source(
                    Environment::with_prefix(ENV_PREFIX)
                        .prefix_separator("__")
                        .separator("__")
                        .try_parsing(true),
                ),
        )
    }

    /// Parse settings from TOML text layered over the defaults
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Self::from_builder(
            Config::builder().add_source(File::from_str(text, config::FileFormat::Toml)),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }
}
