//! Core data models for the learning insight service

use serde::{Deserialize, Serialize};

/// Number of behavioral features the clustering model consumes
pub const NUM_FEATURES: usize = 5;

/// Behavioral metrics of a single learner
///
/// Values are taken as supplied; `rejection_ratio` is expected to lie in
/// `[0, 1]` but nothing here enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub total_active_days: f64,
    pub avg_completion_time_hours: f64,
    pub total_journeys_completed: f64,
    pub rejection_ratio: f64,
    pub avg_exam_score: f64,
}

impl FeatureVector {
    /// Arrange the features in the order the scaler and model were fitted on
    pub fn to_array(&self) -> [f64; NUM_FEATURES] {
        [
            self.total_active_days,
            self.avg_completion_time_hours,
            self.total_journeys_completed,
            self.rejection_ratio,
            self.avg_exam_score,
        ]
    }
}

/// One precomputed row of the clustered dataset snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerRecord {
    pub developer_id: i64,
    pub developer_name: String,
    pub cluster_id: i64,
    pub features: FeatureVector,
}

impl LearnerRecord {
    pub fn identity(&self) -> Identity {
        Identity {
            developer_id: Some(self.developer_id),
            developer_name: Some(self.developer_name.clone()),
        }
    }
}

/// Display metadata for one learning-style cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterProfile {
    pub cluster_id: i64,
    pub label: String,
    pub description: String,
    pub concept_tag: Option<String>,
}

/// Optional caller identity carried through to the response untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub developer_id: Option<i64>,
    pub developer_name: Option<String>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// Resolved insight returned for a single request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightResult {
    pub developer_id: Option<i64>,
    pub developer_name: Option<String>,
    pub cluster_id: i64,
    pub cluster_label: String,
    pub concept_tag: Option<String>,
    pub short_description: String,
    pub insight_text: String,
}
