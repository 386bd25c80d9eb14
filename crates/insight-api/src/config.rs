//! Service configuration

use anyhow::Result;
use insight_lib::artifacts::ArtifactPaths;
use serde::Deserialize;
use std::path::PathBuf;

/// Service configuration, read from `INSIGHT_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Name reported in structured logs
    pub service_name: String,

    /// HTTP listen port
    pub api_port: u16,

    /// Directory relative artifact paths are resolved against
    pub artifact_dir: PathBuf,

    /// Standard-scaler parameters; may be empty for ONNX pipelines
    pub scaler_path: String,

    /// K-means parameters (`.json`) or a full ONNX pipeline (`.onnx`)
    pub model_path: String,

    /// Clustered dataset snapshot (CSV)
    pub dataset_path: String,
}

impl ServiceConfig {
    /// Load configuration from environment, falling back to defaults
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .set_default("service_name", "learning-insight")?
            .set_default("api_port", 8000)?
            .set_default("artifact_dir", ".")?
            .set_default("scaler_path", "scaler.json")?
            .set_default("model_path", "kmeans.json")?
            .set_default("dataset_path", "clustered_students.csv")?
            .add_source(config::Environment::with_prefix("INSIGHT"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths::resolve(&self.artifact_dir, Some(&self.scaler_path), &self.model_path)
    }

    /// Absolute dataset paths are kept as-is by `Path::join`
    pub fn dataset_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.dataset_path)
    }
}
