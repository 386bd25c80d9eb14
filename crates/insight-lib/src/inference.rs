//! Cluster inference
//!
//! Wraps the pre-trained feature scaler and clustering model behind two
//! narrow traits. Parameter-file models (standard scaler + k-means
//! centroids) are evaluated natively; ONNX clustering graphs run through
//! tract-onnx.

use crate::error::InsightError;
use crate::models::{FeatureVector, NUM_FEATURES};
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Normalizes a raw feature row before clustering
pub trait FeatureScaler: Send + Sync {
    fn transform(&self, input: &[f64; NUM_FEATURES]) -> Result<[f64; NUM_FEATURES]>;
}

/// Assigns a normalized feature row to a cluster
pub trait ClusterModel: Send + Sync {
    /// Id of the cluster the row belongs to
    fn predict(&self, input: &[f64; NUM_FEATURES]) -> Result<i64>;

    /// Short backend name used in logs and metrics
    fn kind(&self) -> &'static str;
}

/// Standardization fitted during training: `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: [f64; NUM_FEATURES],
    scale: [f64; NUM_FEATURES],
}

impl StandardScaler {
    pub fn new(mean: &[f64], scale: &[f64]) -> Result<Self> {
        let mean: [f64; NUM_FEATURES] = mean.try_into().map_err(|_| {
            anyhow::anyhow!("scaler mean has {} values, expected {}", mean.len(), NUM_FEATURES)
        })?;
        let mut scale: [f64; NUM_FEATURES] = scale.try_into().map_err(|_| {
            anyhow::anyhow!("scaler scale has {} values, expected {}", scale.len(), NUM_FEATURES)
        })?;

        // A constant feature is stored with scale 0; leave it unscaled
        for s in scale.iter_mut() {
            if *s == 0.0 {
                *s = 1.0;
            }
        }

        Ok(Self { mean, scale })
    }
}

impl FeatureScaler for StandardScaler {
    fn transform(&self, input: &[f64; NUM_FEATURES]) -> Result<[f64; NUM_FEATURES]> {
        let mut out = [0.0; NUM_FEATURES];
        for (i, value) in input.iter().enumerate() {
            out[i] = (value - self.mean[i]) / self.scale[i];
        }
        Ok(out)
    }
}

/// Pass-through scaler for ONNX graphs that normalize with standard operators
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityScaler;

impl FeatureScaler for IdentityScaler {
    fn transform(&self, input: &[f64; NUM_FEATURES]) -> Result<[f64; NUM_FEATURES]> {
        Ok(*input)
    }
}

/// Nearest-centroid assignment over k-means cluster centers
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansModel {
    centroids: Vec<[f64; NUM_FEATURES]>,
}

impl KMeansModel {
    pub fn new(centroids: &[Vec<f64>]) -> Result<Self> {
        if centroids.is_empty() {
            anyhow::bail!("k-means model has no cluster centers");
        }

        let centroids = centroids
            .iter()
            .enumerate()
            .map(|(i, c)| {
                <[f64; NUM_FEATURES]>::try_from(c.as_slice()).map_err(|_| {
                    anyhow::anyhow!(
                        "cluster center {} has {} values, expected {}",
                        i,
                        c.len(),
                        NUM_FEATURES
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { centroids })
    }

    pub fn num_clusters(&self) -> usize {
        self.centroids.len()
    }
}

fn squared_distance(a: &[f64; NUM_FEATURES], b: &[f64; NUM_FEATURES]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

impl ClusterModel for KMeansModel {
    fn predict(&self, input: &[f64; NUM_FEATURES]) -> Result<i64> {
        // Strict comparison keeps the lowest index on ties
        let mut best = 0;
        let mut best_distance = squared_distance(input, &self.centroids[0]);
        for (i, centroid) in self.centroids.iter().enumerate().skip(1) {
            let distance = squared_distance(input, centroid);
            if distance < best_distance {
                best = i;
                best_distance = distance;
            }
        }
        Ok(best as i64)
    }

    fn kind(&self) -> &'static str {
        "kmeans"
    }
}

/// ONNX clustering graph evaluated with tract
///
/// The first model output must be the label tensor (i64 or f32). Only
/// default-domain operators load: an `ai.onnx.ml.Scaler` node (as emitted
/// by an sklearn StandardScaler export) is not supported, so scaling
/// normally comes from `scaler.json` and the graph holds the KMeans step.
pub struct OnnxClusterModel {
    model: TractModel,
}

impl OnnxClusterModel {
    pub fn new(model_bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            model: Self::load_model(model_bytes)?,
        })
    }

    /// Load and optimize an ONNX model from bytes
    fn load_model(model_bytes: &[u8]) -> Result<TractModel> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, NUM_FEATURES]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(model)
    }

    fn features_to_tensor(input: &[f64; NUM_FEATURES]) -> Result<Tensor> {
        let data: Vec<f32> = input.iter().map(|v| *v as f32).collect();
        Ok(tract_ndarray::Array2::from_shape_vec((1, NUM_FEATURES), data)?.into())
    }
}

impl ClusterModel for OnnxClusterModel {
    fn predict(&self, input: &[f64; NUM_FEATURES]) -> Result<i64> {
        let tensor = Self::features_to_tensor(input)?;
        let result = self.model.run(tvec!(tensor.into()))?;
        let output = result.first().context("No output from model")?;

        let label = match output.to_array_view::<i64>() {
            Ok(view) => view.iter().next().copied(),
            Err(_) => output
                .to_array_view::<f32>()
                .context("Label output is neither i64 nor f32")?
                .iter()
                .next()
                .map(|v| v.round() as i64),
        };

        label.context("Model returned an empty label tensor")
    }

    fn kind(&self) -> &'static str {
        "onnx"
    }
}

/// Inference statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InferenceStats {
    pub total_inferences: u64,
    pub slow_inferences: u64,
}

struct LoadedModel {
    scaler: Box<dyn FeatureScaler>,
    model: Box<dyn ClusterModel>,
}

/// Feature vector to cluster id
///
/// An adapter built with [`InferenceAdapter::unavailable`] answers every
/// call with [`InsightError::ModelUnavailable`].
pub struct InferenceAdapter {
    loaded: Option<LoadedModel>,
    inference_count: AtomicU64,
    slow_inference_count: AtomicU64,
}

impl InferenceAdapter {
    pub fn new(scaler: Box<dyn FeatureScaler>, model: Box<dyn ClusterModel>) -> Self {
        Self {
            loaded: Some(LoadedModel { scaler, model }),
            inference_count: AtomicU64::new(0),
            slow_inference_count: AtomicU64::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            loaded: None,
            inference_count: AtomicU64::new(0),
            slow_inference_count: AtomicU64::new(0),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Backend name of the loaded model, if any
    pub fn model_kind(&self) -> Option<&'static str> {
        self.loaded.as_ref().map(|l| l.model.kind())
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<i64, InsightError> {
        let loaded = self.loaded.as_ref().ok_or(InsightError::ModelUnavailable)?;
        let start = Instant::now();

        let scaled = loaded
            .scaler
            .transform(&features.to_array())
            .map_err(|e| InsightError::Inference(format!("{:#}", e)))?;
        let cluster_id = loaded
            .model
            .predict(&scaled)
            .map_err(|e| InsightError::Inference(format!("{:#}", e)))?;

        let elapsed = start.elapsed();
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        if elapsed.as_millis() > MAX_INFERENCE_MS {
            self.slow_inference_count.fetch_add(1, Ordering::Relaxed);
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), cluster_id, "Inference completed");
        }

        Ok(cluster_id)
    }

    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_inferences: self.inference_count.load(Ordering::Relaxed),
            slow_inferences: self.slow_inference_count.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for InferenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceAdapter")
            .field("model_kind", &self.model_kind())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn centroids() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.0, 0.0, 0.0, 0.0],
            vec![10.0, 10.0, 10.0, 10.0, 10.0],
            vec![-10.0, -10.0, -10.0, -10.0, -10.0],
        ]
    }

    fn features(v: f64) -> FeatureVector {
        FeatureVector {
            total_active_days: v,
            avg_completion_time_hours: v,
            total_journeys_completed: v,
            rejection_ratio: v,
            avg_exam_score: v,
        }
    }

    /// Model that always fails, for error propagation tests
    struct BrokenModel;

    impl ClusterModel for BrokenModel {
        fn predict(&self, _input: &[f64; NUM_FEATURES]) -> Result<i64> {
            anyhow::bail!("tensor shape mismatch")
        }

        fn kind(&self) -> &'static str {
            "broken"
        }
    }

    #[test]
    fn test_standard_scaler_transform() {
        let scaler = StandardScaler::new(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 2.0, 2.0, 2.0, 2.0]).unwrap();
        let out = scaler.transform(&[3.0, 2.0, 1.0, 4.0, 9.0]).unwrap();
        assert_eq!(out, [1.0, 0.0, -1.0, 0.0, 2.0]);
    }

    #[test]
    fn test_standard_scaler_zero_scale_is_unscaled() {
        let scaler = StandardScaler::new(&[0.0; 5], &[0.0, 1.0, 1.0, 1.0, 1.0]).unwrap();
        let out = scaler.transform(&[7.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(out[0], 7.0);
    }

    #[test]
    fn test_standard_scaler_rejects_wrong_width() {
        assert!(StandardScaler::new(&[0.0; 4], &[1.0; 5]).is_err());
        assert!(StandardScaler::new(&[0.0; 5], &[1.0; 6]).is_err());
    }

    #[test]
    fn test_kmeans_nearest_centroid() {
        let model = KMeansModel::new(&centroids()).unwrap();
        assert_eq!(model.num_clusters(), 3);
        assert_eq!(model.predict(&[1.0; 5]).unwrap(), 0);
        assert_eq!(model.predict(&[8.0; 5]).unwrap(), 1);
        assert_eq!(model.predict(&[-6.0; 5]).unwrap(), 2);
    }

    #[test]
    fn test_kmeans_tie_goes_to_lowest_index() {
        let model = KMeansModel::new(&[vec![1.0; 5], vec![-1.0; 5]]).unwrap();
        assert_eq!(model.predict(&[0.0; 5]).unwrap(), 0);
    }

    #[test]
    fn test_kmeans_rejects_bad_centers() {
        assert!(KMeansModel::new(&[]).is_err());
        assert!(KMeansModel::new(&[vec![0.0; 5], vec![0.0; 3]]).is_err());
    }

    #[test]
    fn test_adapter_scales_before_clustering() {
        // Raw 20.0 scales to 10.0, which sits on centroid 1
        let scaler = StandardScaler::new(&[0.0; 5], &[2.0; 5]).unwrap();
        let model = KMeansModel::new(&centroids()).unwrap();
        let adapter = InferenceAdapter::new(Box::new(scaler), Box::new(model));

        assert_eq!(adapter.predict(&features(20.0)).unwrap(), 1);
        assert_eq!(adapter.model_kind(), Some("kmeans"));
        assert_eq!(adapter.stats().total_inferences, 1);
    }

    #[test]
    fn test_unavailable_adapter() {
        let adapter = InferenceAdapter::unavailable();
        assert!(!adapter.is_loaded());
        assert_eq!(adapter.predict(&features(1.0)), Err(InsightError::ModelUnavailable));
        assert_eq!(adapter.stats().total_inferences, 0);
    }

    #[test]
    fn test_model_failure_maps_to_inference_error() {
        let adapter = InferenceAdapter::new(Box::new(IdentityScaler), Box::new(BrokenModel));
        match adapter.predict(&features(1.0)) {
            Err(InsightError::Inference(msg)) => assert!(msg.contains("shape mismatch")),
            other => panic!("expected inference error, got {:?}", other),
        }
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let model = KMeansModel::new(&centroids()).unwrap();
        let adapter = InferenceAdapter::new(Box::new(IdentityScaler), Box::new(model));
        let first = adapter.predict(&features(4.9)).unwrap();
        let second = adapter.predict(&features(4.9)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_onnx_rejects_garbage_bytes() {
        assert!(OnnxClusterModel::new(b"not an onnx model").is_err());
    }
}
