//! API client for communicating with the learning insight service

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Non-success answer from the service
#[derive(Debug, Error)]
#[error("API error ({status}): {message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    pub fn is_unavailable(&self) -> bool {
        self.status == 503
    }
}

/// API client for the insight service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // The service answers errors as {"error": ..., "status": ...}
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            return Err(ApiError {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn health(&self) -> Result<SystemHealth> {
        self.get("health").await
    }

    pub async fn clusters(&self) -> Result<Vec<ClusterProfile>> {
        self.get("clusters").await
    }

    pub async fn insight(&self, developer_id: i64) -> Result<Insight> {
        self.get(&format!("insights/{}", developer_id)).await
    }

    pub async fn list_insights(&self, limit: i64) -> Result<Vec<Insight>> {
        self.get(&format!("insights?limit={}", limit)).await
    }

    pub async fn predict(&self, request: &PredictRequest) -> Result<Insight> {
        self.post("predict", request).await
    }
}

// API response types

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemHealth {
    pub status: String,
    pub model_loaded: bool,
    pub data_loaded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterProfile {
    pub cluster_id: i64,
    pub label_id: String,
    #[serde(default)]
    pub concept_tag: Option<String>,
    pub short_description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    #[serde(default)]
    pub developer_id: Option<i64>,
    #[serde(default)]
    pub developer_name: Option<String>,
    pub cluster_id: i64,
    pub cluster_label: String,
    #[serde(default)]
    pub concept_tag: Option<String>,
    pub short_description: String,
    pub insight_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub total_active_days: f64,
    pub avg_completion_time_hours: f64,
    pub total_journeys_completed: f64,
    pub rejection_ratio: f64,
    pub avg_exam_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub developer_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub developer_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const INSIGHT_BODY: &str = r#"{
        "developer_id": 11,
        "developer_name": "Budi",
        "cluster_id": 1,
        "cluster_label": "Consistent Learner",
        "concept_tag": "consistent_learner",
        "short_description": "Belajar rutin",
        "insight_text": "Kamu belajar secara cukup konsisten"
    }"#;

    #[tokio::test]
    async fn test_health() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/health")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"ok","model_loaded":true,"data_loaded":false}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let health = client.health().await.unwrap();

        mock.assert_async().await;
        assert_eq!(health.status, "ok");
        assert!(health.model_loaded);
        assert!(!health.data_loaded);
    }

    #[tokio::test]
    async fn test_insight_by_id() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/insights/11")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(INSIGHT_BODY)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let insight = client.insight(11).await.unwrap();

        assert_eq!(insight.developer_id, Some(11));
        assert_eq!(insight.cluster_label, "Consistent Learner");
        assert_eq!(insight.concept_tag.as_deref(), Some("consistent_learner"));
    }

    #[tokio::test]
    async fn test_list_sends_limit() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/insights")
            .match_query(Matcher::UrlEncoded("limit".into(), "3".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!("[{}]", INSIGHT_BODY))
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let insights = client.list_insights(3).await.unwrap();

        mock.assert_async().await;
        assert_eq!(insights.len(), 1);
    }

    #[tokio::test]
    async fn test_predict_omits_missing_identity() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/predict")
            .match_body(Matcher::Json(serde_json::json!({
                "total_active_days": 2.0,
                "avg_completion_time_hours": 1.5,
                "total_journeys_completed": 3.0,
                "rejection_ratio": 0.05,
                "avg_exam_score": 88.0
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"developer_id":null,"developer_name":"Unknown","cluster_id":0,
                "cluster_label":"Fast Learner","concept_tag":"fast_learner",
                "short_description":"","insight_text":"Aktivitas belajarmu"}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let request = PredictRequest {
            total_active_days: 2.0,
            avg_completion_time_hours: 1.5,
            total_journeys_completed: 3.0,
            rejection_ratio: 0.05,
            avg_exam_score: 88.0,
            developer_id: None,
            developer_name: None,
        };
        let insight = client.predict(&request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(insight.cluster_id, 0);
        assert_eq!(insight.developer_name.as_deref(), Some("Unknown"));
        assert!(insight.developer_id.is_none());
    }

    #[tokio::test]
    async fn test_error_body_is_unwrapped() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/insights/999")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"developer 999 not found","status":404}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.insight(999).await.unwrap_err();
        let api_err = err.downcast_ref::<ApiError>().unwrap();

        assert!(api_err.is_not_found());
        assert_eq!(api_err.message, "developer 999 not found");
    }

    #[tokio::test]
    async fn test_plain_error_body_kept() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/predict")
            .with_status(503)
            .with_body("upstream down")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let request = PredictRequest {
            total_active_days: 1.0,
            avg_completion_time_hours: 1.0,
            total_journeys_completed: 1.0,
            rejection_ratio: 0.0,
            avg_exam_score: 50.0,
            developer_id: Some(5),
            developer_name: None,
        };
        let err = client.predict(&request).await.unwrap_err();
        let api_err = err.downcast_ref::<ApiError>().unwrap();

        assert!(api_err.is_unavailable());
        assert_eq!(api_err.message, "upstream down");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
