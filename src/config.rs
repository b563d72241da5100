//! Configuration management for the fraud scoring engine

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub artifacts: ArtifactConfig,
    pub detection: DetectionConfig,
    pub logging: LoggingConfig,
}

/// Locations of the externally-trained artifacts
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactConfig {
    /// Trained probability model (ONNX)
    pub model_path: PathBuf,
    /// Fitted feature-scaler statistics (JSON)
    pub scaler_path: PathBuf,
}

/// Detection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    /// Default classification threshold when a call does not override it
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    0.5
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from the default file location
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            artifacts: ArtifactConfig {
                model_path: PathBuf::from("models/fraud_model.onnx"),
                scaler_path: PathBuf::from("models/scaler.json"),
            },
            detection: DetectionConfig { threshold: 0.5 },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
            },
        }
    }
}
