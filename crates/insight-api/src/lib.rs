//! HTTP transport for the learning insight service

pub mod api;
pub mod config;
pub mod error;

pub use api::{create_router, AppState};
