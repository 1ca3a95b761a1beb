//! Health checks
//!
//! Liveness only looks at the running flag. Readiness and the full report
//! also probe the store, since every request depends on it.

use crate::api::ApiState;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, error};

/// Health check status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Value reported by the `health_status` gauge
    pub fn as_gauge(&self) -> u8 {
        match self {
            HealthStatus::Unhealthy => 0,
            HealthStatus::Degraded => 1,
            HealthStatus::Healthy => 2,
        }
    }

    /// The worse of two statuses
    fn combine(self, other: HealthStatus) -> HealthStatus {
        if self.as_gauge() <= other.as_gauge() {
            self
        } else {
            other
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Degraded => write!(f, "⚠️  degraded"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    pub name: String,
    pub status: HealthStatus,
    /// Set when the component is not healthy
    pub message: Option<String>,
    pub duration_ms: u64,
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStats {
    /// Parks in the store, when it could be reached
    pub parks: Option<usize>,
    pub uptime_seconds: i64,
}

impl HealthCheck {
    /// Check every component and build a full report
    pub async fn check(state: &ApiState) -> Self {
        let service_check = Self::check_service_running(state).await;
        let (storage_check, parks) = Self::check_storage(state).await;

        state
            .metrics
            .update_component_health("service", service_check.status == HealthStatus::Healthy);
        state
            .metrics
            .update_component_health("storage", storage_check.status != HealthStatus::Unhealthy);
        state.metrics.update_uptime();

        let status = service_check.status.combine(storage_check.status);

        HealthCheck {
            status,
            service: state.service_name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now(),
            checks: vec![service_check, storage_check],
            stats: ServiceStats {
                parks,
                uptime_seconds: state.metrics.service().uptime_seconds.get(),
            },
        }
    }

    /// Simple liveness check - just verify service is running
    pub async fn liveness_check(state: &ApiState) -> HealthStatus {
        if state.is_running().await {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }

    /// Readiness check - verify the service can handle requests
    pub async fn readiness_check(state: &ApiState) -> HealthStatus {
        if !state.is_running().await {
            return HealthStatus::Unhealthy;
        }

        Self::check_storage(state).await.0.status
    }

    async fn check_service_running(state: &ApiState) -> ComponentCheck {
        let start = Instant::now();

        let (status, message) = if state.is_running().await {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Unhealthy,
                Some("Service is shutting down".to_string()),
            )
        };

        ComponentCheck {
            name: "service_running".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Count parks; fewer than two means no matchup can be served
    async fn check_storage(state: &ApiState) -> (ComponentCheck, Option<usize>) {
        let start = Instant::now();
        let store = state.engine.store();

        let count = tokio::task::spawn_blocking(move || store.park_count()).await;

        let (status, message, parks) = match count {
            Ok(Ok(parks)) if parks >= 2 => (HealthStatus::Healthy, None, Some(parks)),
            Ok(Ok(parks)) => {
                debug!("Only {} parks stored", parks);
                (
                    HealthStatus::Degraded,
                    Some(format!("{} parks stored, matchups need 2", parks)),
                    Some(parks),
                )
            }
            Ok(Err(e)) => {
                error!("Storage health check failed: {}", e);
                (
                    HealthStatus::Unhealthy,
                    Some(format!("Storage check failed: {}", e)),
                    None,
                )
            }
            Err(e) => {
                error!("Storage health check task failed: {}", e);
                (
                    HealthStatus::Unhealthy,
                    Some("Storage check did not complete".to_string()),
                    None,
                )
            }
        };

        (
            ComponentCheck {
                name: "storage".to_string(),
                status,
                message,
                duration_ms: start.elapsed().as_millis() as u64,
            },
            parks,
        )
    }
}
