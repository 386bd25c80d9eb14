//! Integration tests for the insight API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use insight_api::{create_router, AppState};
use insight_lib::{
    artifacts::ArtifactPaths,
    dataset::DatasetSnapshot,
    inference::{InferenceAdapter, KMeansModel, StandardScaler},
    resolver::InsightResolver,
    InsightService, StructuredLogger,
};
use std::sync::Arc;
use tower::ServiceExt;

const DATASET: &str = "developer_id,developer_name,cluster_label,total_active_days,\
avg_completion_time_hours,total_journeys_completed,rejection_ratio,avg_exam_score
10,Ayu,0,2,1.5,3,0.05,88
11,Budi,1,40,6.2,25,0.2,92
12,Citra,2,55,11.4,30,0.1,85
13,Dewi,3,20,4.0,8,0.6,61
14,Eka,1,38,5.9,22,0.25,90
15,Fajar,9,10,3.0,5,0.3,70
";

/// Centroids in raw feature space; the scaler is the identity
fn adapter() -> InferenceAdapter {
    let scaler = StandardScaler::new(&[0.0; 5], &[1.0; 5]).unwrap();
    let model = KMeansModel::new(&[
        vec![2.0, 1.5, 3.0, 0.05, 88.0],
        vec![40.0, 6.0, 25.0, 0.2, 92.0],
        vec![55.0, 11.0, 30.0, 0.1, 85.0],
        vec![20.0, 4.0, 8.0, 0.6, 61.0],
    ])
    .unwrap();
    InferenceAdapter::new(Box::new(scaler), Box::new(model))
}

fn build_app(adapter: InferenceAdapter, with_dataset: bool) -> Router {
    let dataset = if with_dataset {
        Ok(DatasetSnapshot::from_reader(DATASET.as_bytes()).unwrap())
    } else {
        Err("clustered_students.csv not found".to_string())
    };
    let service = InsightService::new(
        InsightResolver::builtin().unwrap(),
        adapter,
        dataset,
        StructuredLogger::new("api-test"),
    );
    create_router(Arc::new(AppState::new(Arc::new(service))))
}

fn setup_test_app() -> Router {
    build_app(adapter(), true)
}

async fn get(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read_json(response).await
}

async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read_json(response).await
}

async fn read_json(response: axum::response::Response) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_health_reports_loaded_components() {
    let (status, health) = get(setup_test_app(), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");
    assert_eq!(health["model_loaded"], true);
    assert_eq!(health["data_loaded"], true);
}

#[tokio::test]
async fn test_health_reports_missing_model() {
    let app = build_app(InferenceAdapter::unavailable(), true);
    let (status, health) = get(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["model_loaded"], false);
    assert_eq!(health["data_loaded"], true);
}

#[tokio::test]
async fn test_healthz_degraded_still_ok() {
    let app = build_app(adapter(), false);
    let (status, health) = get(app, "/healthz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["components"]["model"]["status"], "healthy");
    assert_eq!(health["components"]["dataset"]["status"], "unhealthy");
}

#[tokio::test]
async fn test_healthz_returns_503_when_nothing_loaded() {
    let app = build_app(InferenceAdapter::unavailable(), false);
    let (status, health) = get(app, "/healthz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health["status"], "unhealthy");
}

#[tokio::test]
async fn test_readyz() {
    let (status, readiness) = get(setup_test_app(), "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);

    let app = build_app(InferenceAdapter::unavailable(), true);
    let (status, readiness) = get(app, "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);
}

#[tokio::test]
async fn test_list_clusters() {
    let (status, clusters) = get(setup_test_app(), "/clusters").await;

    assert_eq!(status, StatusCode::OK);
    let clusters = clusters.as_array().unwrap();
    assert_eq!(clusters.len(), 4);
    assert_eq!(clusters[0]["cluster_id"], 0);
    assert_eq!(clusters[0]["label_id"], "Fast Learner");
    assert_eq!(clusters[0]["concept_tag"], "fast_learner");
    assert_eq!(clusters[3]["label_id"], "Struggling Learner");
    assert!(clusters[1]["short_description"].as_str().unwrap().len() > 10);
}

#[tokio::test]
async fn test_get_insight_by_developer_id() {
    let (status, insight) = get(setup_test_app(), "/insights/11").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(insight["developer_id"], 11);
    assert_eq!(insight["developer_name"], "Budi");
    assert_eq!(insight["cluster_id"], 1);
    assert_eq!(insight["cluster_label"], "Consistent Learner");
    assert!(insight["insight_text"].as_str().unwrap().contains("0.20"));
}

#[tokio::test]
async fn test_get_insight_unknown_cluster_falls_back() {
    let (status, insight) = get(setup_test_app(), "/insights/15").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(insight["cluster_label"], "Cluster 9");
    assert_eq!(insight["short_description"], "");
    assert_eq!(insight["insight_text"], "");
    assert!(insight["concept_tag"].is_null());
}

#[tokio::test]
async fn test_get_insight_not_found() {
    let (status, body) = get(setup_test_app(), "/insights/999").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn test_get_insight_without_dataset() {
    let app = build_app(adapter(), false);
    let (status, body) = get(app, "/insights/10").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], 503);
}

#[tokio::test]
async fn test_list_insights_default_and_limit() {
    let (status, all) = get(setup_test_app(), "/insights").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 6);

    let (status, five) = get(setup_test_app(), "/insights?limit=5").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = five
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["developer_id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![10, 11, 12, 13, 14]);
}

#[tokio::test]
async fn test_list_insights_rejects_out_of_range_limit() {
    let (status, _) = get(setup_test_app(), "/insights?limit=150").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = get(setup_test_app(), "/insights?limit=0").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_list_insights_unparseable_limit_is_json_422() {
    for uri in ["/insights?limit=abc", "/insights?limit=100000000000000000000"] {
        let (status, body) = get(setup_test_app(), uri).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", uri);
        assert_eq!(body["status"], 422, "{}", uri);
        assert!(!body["error"].as_str().unwrap().is_empty(), "{}", uri);
    }
}

#[tokio::test]
async fn test_get_insight_non_numeric_id_is_json_422() {
    let (status, body) = get(setup_test_app(), "/insights/abc").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], 422);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_predict_malformed_json_has_json_error_body() {
    let response = setup_test_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    let (status, body) = read_json(response).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_predict_fast_learner() {
    let body = serde_json::json!({
        "total_active_days": 2,
        "avg_completion_time_hours": 1.5,
        "total_journeys_completed": 3,
        "rejection_ratio": 0.05,
        "avg_exam_score": 88
    });
    let (status, insight) = post_json(setup_test_app(), "/predict", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(insight["cluster_id"], 0);
    assert_eq!(insight["cluster_label"], "Fast Learner");
    assert_eq!(insight["concept_tag"], "fast_learner");
    assert_eq!(insight["developer_name"], "Unknown");
    assert!(insight["developer_id"].is_null());

    let text = insight["insight_text"].as_str().unwrap();
    for needle in ["2", "1.5", "3", "88"] {
        assert!(text.contains(needle), "missing {} in {}", needle, text);
    }
}

#[tokio::test]
async fn test_predict_carries_identity() {
    let body = serde_json::json!({
        "total_active_days": 21,
        "avg_completion_time_hours": 4.2,
        "total_journeys_completed": 7,
        "rejection_ratio": 0.55,
        "avg_exam_score": 60,
        "developer_id": 77,
        "developer_name": "Gita"
    });
    let (status, insight) = post_json(setup_test_app(), "/predict", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(insight["cluster_id"], 3);
    assert_eq!(insight["developer_id"], 77);
    assert_eq!(insight["developer_name"], "Gita");
    assert!(insight["insight_text"].as_str().unwrap().contains("0.55"));
}

#[tokio::test]
async fn test_predict_is_deterministic() {
    let body = serde_json::json!({
        "total_active_days": 30,
        "avg_completion_time_hours": 8,
        "total_journeys_completed": 26,
        "rejection_ratio": 0.15,
        "avg_exam_score": 88
    });
    let (_, first) = post_json(setup_test_app(), "/predict", body.clone()).await;
    let (_, second) = post_json(setup_test_app(), "/predict", body).await;

    assert_eq!(first["cluster_id"], second["cluster_id"]);
    assert_eq!(first["insight_text"], second["insight_text"]);
}

#[tokio::test]
async fn test_predict_without_model() {
    let app = build_app(InferenceAdapter::unavailable(), true);
    let body = serde_json::json!({
        "total_active_days": 2,
        "avg_completion_time_hours": 1.5,
        "total_journeys_completed": 3,
        "rejection_ratio": 0.05,
        "avg_exam_score": 88
    });
    let (status, error) = post_json(app, "/predict", body).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error["status"], 503);
}

#[tokio::test]
async fn test_predict_rejects_incomplete_body() {
    let body = serde_json::json!({ "total_active_days": 2 });
    let (status, error) = post_json(setup_test_app(), "/predict", body).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["status"], 422);
    assert!(error["error"].as_str().unwrap().contains("avg_completion_time_hours"));
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    // Drive one prediction so the histogram has a sample
    let body = serde_json::json!({
        "total_active_days": 2,
        "avg_completion_time_hours": 1.5,
        "total_journeys_completed": 3,
        "rejection_ratio": 0.05,
        "avg_exam_score": 88
    });
    post_json(setup_test_app(), "/predict", body).await;

    let response = setup_test_app()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();

    assert!(metrics_text.contains("learning_insight_prediction_latency_seconds_bucket"));
    assert!(metrics_text.contains("learning_insight_insights_served_total"));
    assert!(metrics_text.contains("learning_insight_model_loaded"));
    assert!(metrics_text.contains("learning_insight_dataset_records"));
}

#[tokio::test]
async fn test_service_loaded_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("scaler.json"),
        r#"{"mean":[0,0,0,0,0],"scale":[1,1,1,1,1]}"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("kmeans.json"),
        r#"{"cluster_centers":[[2,1.5,3,0.05,88],[40,6,25,0.2,92],[55,11,30,0.1,85],[20,4,8,0.6,61]]}"#,
    )
    .unwrap();
    std::fs::write(dir.path().join("clustered_students.csv"), DATASET).unwrap();

    let paths = ArtifactPaths::resolve(dir.path(), Some("scaler.json"), "kmeans.json");
    let service = InsightService::load(
        &paths,
        &dir.path().join("clustered_students.csv"),
        StructuredLogger::new("api-test"),
    )
    .unwrap();
    let app = create_router(Arc::new(AppState::new(Arc::new(service))));

    let (status, health) = get(app.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["model_loaded"], true);
    assert_eq!(health["data_loaded"], true);

    let (status, insight) = get(app, "/insights/12").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(insight["cluster_label"], "Reflective Learner");
}

#[tokio::test]
async fn test_service_with_missing_artifacts_still_serves_lookups() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("clustered_students.csv"), DATASET).unwrap();

    let paths = ArtifactPaths::resolve(dir.path(), Some("scaler.json"), "kmeans.json");
    let service = InsightService::load(
        &paths,
        &dir.path().join("clustered_students.csv"),
        StructuredLogger::new("api-test"),
    )
    .unwrap();
    let app = create_router(Arc::new(AppState::new(Arc::new(service))));

    let (_, health) = get(app.clone(), "/health").await;
    assert_eq!(health["model_loaded"], false);

    let (status, _) = get(app.clone(), "/insights/10").await;
    assert_eq!(status, StatusCode::OK);

    let body = serde_json::json!({
        "total_active_days": 2,
        "avg_completion_time_hours": 1.5,
        "total_journeys_completed": 3,
        "rejection_ratio": 0.05,
        "avg_exam_score": 88
    });
    let (status, _) = post_json(app, "/predict", body).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
