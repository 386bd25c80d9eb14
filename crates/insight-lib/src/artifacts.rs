//! Loading of the pre-trained scaler and clustering model
//!
//! Supported layouts:
//! - `scaler.json` (`{"mean": [..], "scale": [..]}`) with `kmeans.json`
//!   (`{"cluster_centers": [[..], ..]}`)
//! - a KMeans-only `.onnx` graph (standard `ai.onnx` operators), normally
//!   preceded by `scaler.json`
//!
//! Any artifact may ship a `<file>.sha256` sidecar holding its hex digest;
//! when the sidecar exists the artifact must match it.

use crate::inference::{
    ClusterModel, FeatureScaler, IdentityScaler, InferenceAdapter, KMeansModel,
    OnnxClusterModel, StandardScaler,
};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Artifact loading failures
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("checksum mismatch for {}: expected {expected}, got {actual}", .path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("invalid artifact {}: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },
}

/// Serialized standard-scaler parameters
#[derive(Debug, Clone, Deserialize)]
pub struct ScalerParams {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// Serialized k-means parameters
#[derive(Debug, Clone, Deserialize)]
pub struct KMeansParams {
    pub cluster_centers: Vec<Vec<f64>>,
}

/// Where the model artifacts live on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Scaler parameters; required for k-means JSON models
    pub scaler: Option<PathBuf>,
    /// `.json` k-means parameters or an `.onnx` pipeline
    pub model: PathBuf,
}

impl ArtifactPaths {
    /// Resolve relative paths against `base_dir`
    pub fn resolve(base_dir: &Path, scaler: Option<&str>, model: &str) -> Self {
        Self {
            scaler: scaler.filter(|s| !s.is_empty()).map(|s| base_dir.join(s)),
            model: base_dir.join(model),
        }
    }

    fn is_onnx(&self) -> bool {
        self.model
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("onnx"))
            .unwrap_or(false)
    }
}

/// Build an inference adapter from the artifacts at `paths`
pub fn load_inference_adapter(paths: &ArtifactPaths) -> Result<InferenceAdapter, ArtifactError> {
    let model_bytes = read_verified(&paths.model)?;

    // Without a scaler file the ONNX graph must normalize on its own
    let scaler: Box<dyn FeatureScaler> = match (&paths.scaler, paths.is_onnx()) {
        (Some(path), false) => Box::new(load_scaler(path)?),
        (Some(path), true) if path.exists() => Box::new(load_scaler(path)?),
        (_, true) => Box::new(IdentityScaler),
        (None, false) => {
            return Err(ArtifactError::Invalid {
                path: paths.model.clone(),
                reason: "k-means parameters require a scaler file".to_string(),
            })
        }
    };

    let model: Box<dyn ClusterModel> = if paths.is_onnx() {
        Box::new(OnnxClusterModel::new(&model_bytes).map_err(|e| invalid(&paths.model, e))?)
    } else {
        let params: KMeansParams =
            serde_json::from_slice(&model_bytes).map_err(|source| ArtifactError::Parse {
                path: paths.model.clone(),
                source,
            })?;
        Box::new(KMeansModel::new(&params.cluster_centers).map_err(|e| invalid(&paths.model, e))?)
    };

    info!(
        model = %paths.model.display(),
        kind = model.kind(),
        "Loaded clustering model"
    );

    Ok(InferenceAdapter::new(scaler, model))
}

fn load_scaler(path: &Path) -> Result<StandardScaler, ArtifactError> {
    let bytes = read_verified(path)?;
    let params: ScalerParams =
        serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    StandardScaler::new(&params.mean, &params.scale).map_err(|e| invalid(path, e))
}

fn invalid(path: &Path, err: anyhow::Error) -> ArtifactError {
    ArtifactError::Invalid {
        path: path.to_path_buf(),
        reason: format!("{:#}", err),
    }
}

/// Read a file and check it against its `.sha256` sidecar when present
pub fn read_verified(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    let bytes = fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let sidecar = checksum_path(path);
    if sidecar.exists() {
        let content = fs::read_to_string(&sidecar).map_err(|source| ArtifactError::Io {
            path: sidecar.clone(),
            source,
        })?;
        let expected = content
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let actual = compute_checksum(&bytes);
        if expected != actual {
            return Err(ArtifactError::ChecksumMismatch {
                path: path.to_path_buf(),
                expected,
                actual,
            });
        }
        debug!(path = %path.display(), checksum = %actual, "Artifact checksum validated");
    }

    Ok(bytes)
}

fn checksum_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".sha256");
    PathBuf::from(name)
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
