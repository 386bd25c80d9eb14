//! Error types for the insight library

use thiserror::Error;

/// Smallest accepted page size for insight listings
pub const MIN_LIST_LIMIT: i64 = 1;

/// Largest accepted page size for insight listings
pub const MAX_LIST_LIMIT: i64 = 100;

/// Errors surfaced by the service operations
///
/// The `*Unavailable` variants and `NotFound` stay distinct so the
/// transport layer can map them to different response codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsightError {
    /// Scaler or clustering model failed to load at startup
    #[error("clustering model is not loaded")]
    ModelUnavailable,

    /// Clustered dataset snapshot failed to load at startup
    #[error("clustered dataset is not loaded")]
    DatasetUnavailable,

    /// No learner with the given id exists in the snapshot
    #[error("developer {0} not found in clustered dataset")]
    NotFound(i64),

    /// Listing limit outside `MIN_LIST_LIMIT..=MAX_LIST_LIMIT`
    #[error("limit {0} is outside the allowed range 1..=100")]
    InvalidLimit(i64),

    /// The loaded model failed while classifying a vector
    #[error("inference failed: {0}")]
    Inference(String),
}

pub type Result<T> = std::result::Result<T, InsightError>;
