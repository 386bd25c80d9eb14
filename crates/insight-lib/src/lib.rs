//! Learning insight library
//!
//! This crate provides the core functionality for:
//! - Static cluster profile and insight template tables
//! - Scaler + clustering model inference
//! - Clustered dataset snapshot lookup
//! - Resolution of cluster assignments into insight responses
//! - Health checks and observability

pub mod artifacts;
pub mod dataset;
pub mod error;
pub mod health;
pub mod inference;
pub mod models;
pub mod observability;
pub mod profiles;
pub mod resolver;
pub mod service;
pub mod templates;

pub use error::{InsightError, Result};
pub use health::{ComponentHealth, ComponentStatus, HealthReport, ReadinessResponse};
pub use models::*;
pub use observability::{InsightMetrics, StructuredLogger};
pub use service::{InsightService, DEFAULT_LIST_LIMIT};
