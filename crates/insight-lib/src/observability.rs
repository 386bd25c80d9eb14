//! Observability infrastructure for the insight service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, served insights, lookup misses, load state)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Histogram buckets for inference latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<InsightMetricsInner> = OnceLock::new();

struct InsightMetricsInner {
    prediction_latency_seconds: Histogram,
    insights_served: IntCounterVec,
    lookup_misses: IntCounter,
    model_loaded: IntGauge,
    dataset_records: IntGauge,
}

impl InsightMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "learning_insight_prediction_latency_seconds",
                "Time spent scaling and clustering a feature vector",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            insights_served: register_int_counter_vec!(
                "learning_insight_insights_served_total",
                "Insights returned, by source path",
                &["source"]
            )
            .expect("Failed to register insights_served"),

            lookup_misses: register_int_counter!(
                "learning_insight_lookup_misses_total",
                "Developer id lookups with no matching record"
            )
            .expect("Failed to register lookup_misses"),

            model_loaded: register_int_gauge!(
                "learning_insight_model_loaded",
                "1 when the scaler and clustering model are loaded"
            )
            .expect("Failed to register model_loaded"),

            dataset_records: register_int_gauge!(
                "learning_insight_dataset_records",
                "Number of learner records in the loaded snapshot"
            )
            .expect("Failed to register dataset_records"),
        }
    }
}

/// Source label for served insights
pub mod sources {
    pub const LOOKUP: &str = "lookup";
    pub const LIST: &str = "list";
    pub const PREDICT: &str = "predict";
}

/// Handle to the process-wide insight metrics
///
/// Clones share the same underlying Prometheus collectors.
#[derive(Clone)]
pub struct InsightMetrics {
    _private: (),
}

impl Default for InsightMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl InsightMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(InsightMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &InsightMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_insights_served(&self, source: &str, count: u64) {
        self.inner()
            .insights_served
            .with_label_values(&[source])
            .inc_by(count);
    }

    pub fn inc_lookup_misses(&self) {
        self.inner().lookup_misses.inc();
    }

    pub fn set_model_loaded(&self, loaded: bool) {
        self.inner().model_loaded.set(i64::from(loaded));
    }

    pub fn set_dataset_records(&self, records: usize) {
        self.inner().dataset_records.set(records as i64);
    }
}

/// Structured logger for service lifecycle events
#[derive(Clone)]
pub struct StructuredLogger {
    service_name: String,
}

impl StructuredLogger {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    pub fn log_startup(&self, version: &str, model_loaded: bool, dataset_records: Option<usize>) {
        info!(
            event = "service_started",
            service = %self.service_name,
            version = %version,
            model_loaded = model_loaded,
            dataset_records = ?dataset_records,
            "Learning insight service started"
        );
    }

    /// Artifacts failed to load; predictions will be refused
    pub fn log_artifacts_unavailable(&self, reason: &str) {
        warn!(
            event = "artifacts_unavailable",
            service = %self.service_name,
            reason = %reason,
            "Model artifacts failed to load, prediction disabled"
        );
    }

    /// Dataset failed to load; lookups and listings will be refused
    pub fn log_dataset_unavailable(&self, reason: &str) {
        warn!(
            event = "dataset_unavailable",
            service = %self.service_name,
            reason = %reason,
            "Clustered dataset failed to load, lookups disabled"
        );
    }

    pub fn log_prediction(&self, cluster_id: i64, developer_id: Option<i64>, latency_us: u128) {
        debug!(
            event = "insight_predicted",
            service = %self.service_name,
            cluster_id = cluster_id,
            developer_id = ?developer_id,
            latency_us = latency_us,
            "Predicted learner cluster"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service_name,
            reason = %reason,
            "Learning insight service shutting down"
        );
    }
}
