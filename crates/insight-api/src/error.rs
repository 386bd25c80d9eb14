//! Mapping of service errors onto HTTP responses

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use insight_lib::InsightError;
use serde_json::json;

pub type ApiResult<T> = Result<T, ApiError>;

/// HTTP-facing error: a service failure or a request that failed to parse
#[derive(Debug)]
pub enum ApiError {
    Service(InsightError),
    /// Path, query or body that could not be extracted
    InvalidRequest(String),
    /// Body that is not JSON at all (syntax, content type)
    MalformedBody { status: StatusCode, message: String },
}

impl From<InsightError> for ApiError {
    fn from(err: InsightError) -> Self {
        Self::Service(err)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            // Well-formed JSON with missing or mistyped fields
            JsonRejection::JsonDataError(e) => Self::InvalidRequest(e.body_text()),
            other => Self::MalformedBody {
                status: other.status(),
                message: other.body_text(),
            },
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Service(InsightError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Service(InsightError::ModelUnavailable | InsightError::DatasetUnavailable) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Service(InsightError::InvalidLimit(_)) | Self::InvalidRequest(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Service(InsightError::Inference(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MalformedBody { status, .. } => *status,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Service(err) => err.to_string(),
            Self::InvalidRequest(message) | Self::MalformedBody { message, .. } => message.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();

        match &self {
            Self::Service(InsightError::Inference(detail)) => {
                tracing::error!(detail = %detail, "Inference failed")
            }
            Self::Service(InsightError::ModelUnavailable | InsightError::DatasetUnavailable) => {
                tracing::warn!(error = %message, "Request refused, component unavailable")
            }
            Self::InvalidRequest(_) | Self::MalformedBody { .. } => {
                tracing::debug!(error = %message, "Rejected malformed request")
            }
            // Expected outcomes for caller-supplied input
            Self::Service(InsightError::NotFound(_) | InsightError::InvalidLimit(_)) => {}
        }

        let body = Json(json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
