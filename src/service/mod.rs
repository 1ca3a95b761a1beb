//! Service layer for the park-ranker service
//!
//! This module contains the main application state, service coordination,
//! and health checks for the production service.

pub mod app;
pub mod health;

pub use app::{AppState, ServiceError};
pub use health::{HealthCheck, HealthStatus};
