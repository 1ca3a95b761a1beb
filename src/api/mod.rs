//! HTTP API
//!
//! Exposes the ranking engine over JSON next to the health and metrics
//! endpoints.

pub mod handlers;
pub mod server;

use crate::engine::RankingEngine;
use crate::metrics::MetricsCollector;
use std::sync::Arc;
use tokio::sync::RwLock;

pub use handlers::ApiError;
pub use server::{router, HttpServer, HttpServerConfig};

/// State shared by every request handler
#[derive(Clone)]
pub struct ApiState {
    pub service_name: String,
    pub engine: RankingEngine,
    pub metrics: Arc<MetricsCollector>,
    /// Cleared once shutdown begins
    pub is_running: Arc<RwLock<bool>>,
}

impl ApiState {
    pub fn new(
        service_name: impl Into<String>,
        engine: RankingEngine,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            engine,
            metrics,
            is_running: Arc::new(RwLock::new(true)),
        }
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }
}
