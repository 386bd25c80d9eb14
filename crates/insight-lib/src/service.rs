//! Service facade consumed by the transport layer
//!
//! Both request paths converge on [`InsightResolver`]:
//! a developer id goes through the dataset snapshot, a raw feature vector
//! goes through the inference adapter.

use crate::artifacts::{load_inference_adapter, ArtifactPaths};
use crate::dataset::DatasetSnapshot;
use crate::error::{InsightError, Result, MAX_LIST_LIMIT, MIN_LIST_LIMIT};
use crate::health::{ComponentHealth, HealthReport};
use crate::inference::InferenceAdapter;
use crate::models::{ClusterProfile, FeatureVector, Identity, InsightResult};
use crate::observability::{sources, InsightMetrics, StructuredLogger};
use crate::resolver::InsightResolver;
use crate::templates::TemplateError;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// Page size used when a listing does not specify one
pub const DEFAULT_LIST_LIMIT: i64 = 10;

/// Name reported for anonymous prediction requests
pub const UNKNOWN_DEVELOPER_NAME: &str = "Unknown";

/// Read-only insight service shared by all requests
pub struct InsightService {
    resolver: InsightResolver,
    adapter: InferenceAdapter,
    dataset: std::result::Result<DatasetSnapshot, String>,
    model_error: Option<String>,
    metrics: InsightMetrics,
    logger: StructuredLogger,
}

impl InsightService {
    /// Assemble a service from already-loaded parts
    ///
    /// `dataset` carries the load failure reason when the snapshot is missing.
    pub fn new(
        resolver: InsightResolver,
        adapter: InferenceAdapter,
        dataset: std::result::Result<DatasetSnapshot, String>,
        logger: StructuredLogger,
    ) -> Self {
        let metrics = InsightMetrics::new();
        metrics.set_model_loaded(adapter.is_loaded());
        metrics.set_dataset_records(dataset.as_ref().map(|d| d.len()).unwrap_or(0));

        let model_error = if adapter.is_loaded() {
            None
        } else {
            Some("model artifacts not loaded".to_string())
        };

        Self {
            resolver,
            adapter,
            dataset,
            model_error,
            metrics,
            logger,
        }
    }

    /// Load artifacts and dataset from disk
    ///
    /// Artifact or dataset failures are logged and leave the service running
    /// in a degraded mode; only a broken built-in template is fatal.
    pub fn load(
        artifacts: &ArtifactPaths,
        dataset_path: &Path,
        logger: StructuredLogger,
    ) -> std::result::Result<Self, TemplateError> {
        let resolver = InsightResolver::builtin()?;

        let (adapter, model_error) = match load_inference_adapter(artifacts) {
            Ok(adapter) => (adapter, None),
            Err(e) => {
                let reason = e.to_string();
                logger.log_artifacts_unavailable(&reason);
                (InferenceAdapter::unavailable(), Some(reason))
            }
        };

        let dataset = DatasetSnapshot::load(dataset_path).map_err(|e| {
            let reason = e.to_string();
            logger.log_dataset_unavailable(&reason);
            reason
        });

        let mut service = Self::new(resolver, adapter, dataset, logger);
        if model_error.is_some() {
            service.model_error = model_error;
        }
        Ok(service)
    }

    pub fn model_loaded(&self) -> bool {
        self.adapter.is_loaded()
    }

    pub fn data_loaded(&self) -> bool {
        self.dataset.is_ok()
    }

    /// Number of records in the snapshot, if it loaded
    pub fn dataset_records(&self) -> Option<usize> {
        self.dataset.as_ref().ok().map(|d| d.len())
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    pub fn health(&self) -> HealthReport {
        let model = match (&self.model_error, self.adapter.model_kind()) {
            (None, Some(kind)) => ComponentHealth::healthy(format!("{} model loaded", kind)),
            (Some(reason), _) => ComponentHealth::unhealthy(reason.clone()),
            (None, None) => ComponentHealth::unhealthy("model artifacts not loaded"),
        };

        let dataset = match &self.dataset {
            Ok(snapshot) => ComponentHealth::healthy(format!("{} records", snapshot.len())),
            Err(reason) => ComponentHealth::unhealthy(reason.clone()),
        };

        HealthReport::new(model, dataset)
    }

    /// All known cluster profiles in cluster-id order
    pub fn list_cluster_profiles(&self) -> Vec<ClusterProfile> {
        self.resolver.profiles().iter().cloned().collect()
    }

    fn dataset(&self) -> Result<&DatasetSnapshot> {
        self.dataset
            .as_ref()
            .map_err(|_| InsightError::DatasetUnavailable)
    }

    pub fn get_insight_by_developer_id(&self, developer_id: i64) -> Result<InsightResult> {
        let dataset = self.dataset()?;

        let Some(record) = dataset.find_by_developer_id(developer_id) else {
            debug!(developer_id, "Developer not found in clustered dataset");
            self.metrics.inc_lookup_misses();
            return Err(InsightError::NotFound(developer_id));
        };

        self.metrics.inc_insights_served(sources::LOOKUP, 1);
        Ok(self
            .resolver
            .resolve(record.cluster_id, &record.features, record.identity()))
    }

    /// The first `limit` insights in snapshot order; `limit` must be within 1..=100
    pub fn list_insights(&self, limit: i64) -> Result<Vec<InsightResult>> {
        if !(MIN_LIST_LIMIT..=MAX_LIST_LIMIT).contains(&limit) {
            return Err(InsightError::InvalidLimit(limit));
        }
        let dataset = self.dataset()?;

        let insights: Vec<InsightResult> = dataset
            .first_n(limit as usize)
            .iter()
            .map(|record| {
                self.resolver
                    .resolve(record.cluster_id, &record.features, record.identity())
            })
            .collect();

        self.metrics
            .inc_insights_served(sources::LIST, insights.len() as u64);
        Ok(insights)
    }

    /// Classify a feature vector with the loaded model and resolve its insight
    pub fn predict_insight(
        &self,
        features: &FeatureVector,
        identity: Identity,
    ) -> Result<InsightResult> {
        let start = Instant::now();
        let cluster_id = self.adapter.predict(features)?;
        let elapsed = start.elapsed();

        self.metrics.observe_prediction_latency(elapsed.as_secs_f64());
        self.metrics.inc_insights_served(sources::PREDICT, 1);
        self.logger
            .log_prediction(cluster_id, identity.developer_id, elapsed.as_micros());

        let identity = Identity {
            developer_name: identity
                .developer_name
                .filter(|name| !name.is_empty())
                .or_else(|| Some(UNKNOWN_DEVELOPER_NAME.to_string())),
            ..identity
        };

        Ok(self.resolver.resolve(cluster_id, features, identity))
    }
}

impl std::fmt::Debug for InsightService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsightService")
            .field("adapter", &self.adapter)
            .field("dataset_records", &self.dataset_records())
            .finish()
    }
}
