//! Health reporting for the insight service
//!
//! Load state never changes after startup, so health is a snapshot derived
//! from what the service managed to load rather than a mutable registry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Component is functioning normally
    Healthy,
    /// Some components failed but the service still answers part of its API
    Degraded,
    /// Component has failed
    Unhealthy,
}

impl ComponentStatus {
    /// Returns true if the component is at least partially operational
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }
}

/// Information about a component's health
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ComponentHealth {
    pub fn healthy(message: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Healthy,
            message: Some(message.into()),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Unhealthy,
            message: Some(message.into()),
        }
    }
}

/// Component names for health tracking
pub mod components {
    pub const MODEL: &str = "model";
    pub const DATASET: &str = "dataset";
}

/// Overall health snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: ComponentStatus,
    pub model_loaded: bool,
    pub data_loaded: bool,
    pub components: BTreeMap<String, ComponentHealth>,
    pub checked_at: i64,
}

impl HealthReport {
    pub fn new(model: ComponentHealth, dataset: ComponentHealth) -> Self {
        let model_loaded = model.status == ComponentStatus::Healthy;
        let data_loaded = dataset.status == ComponentStatus::Healthy;

        let mut by_name = BTreeMap::new();
        by_name.insert(components::MODEL.to_string(), model);
        by_name.insert(components::DATASET.to_string(), dataset);

        Self {
            status: Self::compute_status(&by_name),
            model_loaded,
            data_loaded,
            components: by_name,
            checked_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Healthy when every component is, unhealthy when none is, degraded otherwise
    pub fn compute_status(components: &BTreeMap<String, ComponentHealth>) -> ComponentStatus {
        let healthy = components
            .values()
            .filter(|c| c.status == ComponentStatus::Healthy)
            .count();

        if healthy == components.len() {
            ComponentStatus::Healthy
        } else if healthy == 0 {
            ComponentStatus::Unhealthy
        } else {
            ComponentStatus::Degraded
        }
    }

    /// Ready only when every operation can be served
    pub fn readiness(&self) -> ReadinessResponse {
        let reason = match (self.model_loaded, self.data_loaded) {
            (true, true) => None,
            (false, true) => Some("Clustering model not loaded"),
            (true, false) => Some("Clustered dataset not loaded"),
            (false, false) => Some("Clustering model and dataset not loaded"),
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason: reason.map(str::to_string),
        }
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
