//! HTTP API for insights, health checks and Prometheus metrics

use crate::error::ApiResult;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use insight_lib::{
    ComponentStatus, FeatureVector, Identity, InsightResult, InsightService, DEFAULT_LIST_LIMIT,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<InsightService>,
}

impl AppState {
    pub fn new(service: Arc<InsightService>) -> Self {
        Self { service }
    }
}

/// Load summary returned by `/health`
#[derive(Debug, Serialize, Deserialize)]
pub struct SystemHealth {
    pub status: String,
    pub model_loaded: bool,
    pub data_loaded: bool,
}

/// One entry of `/clusters`
#[derive(Debug, Serialize, Deserialize)]
pub struct ClusterProfileResponse {
    pub cluster_id: i64,
    pub label_id: String,
    pub concept_tag: Option<String>,
    pub short_description: String,
}

/// Body of `/predict`
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictRequest {
    pub total_active_days: f64,
    pub avg_completion_time_hours: f64,
    pub total_journeys_completed: f64,
    pub rejection_ratio: f64,
    pub avg_exam_score: f64,
    #[serde(default)]
    pub developer_id: Option<i64>,
    #[serde(default)]
    pub developer_name: Option<String>,
}

impl PredictRequest {
    fn into_parts(self) -> (FeatureVector, Identity) {
        let features = FeatureVector {
            total_active_days: self.total_active_days,
            avg_completion_time_hours: self.avg_completion_time_hours,
            total_journeys_completed: self.total_journeys_completed,
            rejection_ratio: self.rejection_ratio,
            avg_exam_score: self.avg_exam_score,
        };
        let identity = Identity {
            developer_id: self.developer_id,
            developer_name: self.developer_name,
        };
        (features, identity)
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<SystemHealth> {
    Json(SystemHealth {
        status: "ok".to_string(),
        model_loaded: state.service.model_loaded(),
        data_loaded: state.service.data_loaded(),
    })
}

/// Component health - 503 only when nothing loaded
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = state.service.health();

    let status_code = match report.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still answers part of the API
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(report))
}

/// Readiness - 200 only when model and dataset are both loaded
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.service.health().readiness();

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

async fn list_clusters(State(state): State<Arc<AppState>>) -> Json<Vec<ClusterProfileResponse>> {
    let profiles = state
        .service
        .list_cluster_profiles()
        .into_iter()
        .map(|p| ClusterProfileResponse {
            cluster_id: p.cluster_id,
            label_id: p.label,
            concept_tag: p.concept_tag,
            short_description: p.description,
        })
        .collect();

    Json(profiles)
}

async fn get_insight(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<InsightResult>> {
    let Path(developer_id) = path?;
    Ok(Json(state.service.get_insight_by_developer_id(developer_id)?))
}

async fn list_insights(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<Vec<InsightResult>>> {
    let Query(params) = query?;
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    Ok(Json(state.service.list_insights(limit)?))
}

async fn predict(
    State(state): State<Arc<AppState>>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> ApiResult<Json<InsightResult>> {
    let Json(request) = body?;
    let (features, identity) = request.into_parts();
    Ok(Json(state.service.predict_insight(&features, identity)?))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            Vec::new(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/clusters", get(list_clusters))
        .route("/insights", get(list_insights))
        .route("/insights/:developer_id", get(get_insight))
        .route("/predict", post(predict))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the API server, stopping gracefully when `shutdown` resolves
pub async fn serve(
    port: u16,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
