//! Main application state and service coordination
//!
//! This module builds the store, engine and HTTP server from configuration
//! and owns the background tasks for the lifetime of the service.

use crate::api::{ApiState, HttpServer, HttpServerConfig};
use crate::config::{AppConfig, StorageBackend};
use crate::engine::RankingEngine;
use crate::metrics::MetricsCollector;
use crate::service::health::HealthCheck;
use crate::storage::{InMemoryParkStore, ParkStore, SqliteParkStore};
use anyhow::Result;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    config: AppConfig,

    /// State shared with request handlers
    api: ApiState,

    http_server: Arc<HttpServer>,

    background_tasks: Vec<JoinHandle<()>>,
}

impl AppState {
    /// Open the store, seed it if empty and build the engine
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing {} ranking service", config.service.name);
        crate::config::validate_config(&config).map_err(|e| ServiceError::Configuration {
            message: e.to_string(),
        })?;

        let metrics =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let store = Self::open_store(&config).await?;
        let engine = RankingEngine::new(store, config.rating.clone())
            .map_err(|e| ServiceError::Initialization {
                message: format!("Failed to create ranking engine: {}", e),
            })?
            .with_metrics(metrics.clone());

        Self::seed_parks(&config, &engine).await?;

        let api = ApiState::new(config.service.name.clone(), engine, metrics);
        *api.is_running.write().await = false;

        let http_server = Arc::new(HttpServer::new(
            HttpServerConfig {
                host: config.service.http_host.clone(),
                port: config.service.http_port,
            },
            api.clone(),
        ));

        Ok(Self {
            config,
            api,
            http_server,
            background_tasks: Vec::new(),
        })
    }

    /// Start serving HTTP and the periodic health task
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting {} service", self.config.service.name);
        *self.api.is_running.write().await = true;

        let server = self.http_server.clone();
        let port = self.config.service.http_port;
        self.background_tasks.push(tokio::spawn(async move {
            if let Err(e) = server.start().await {
                error!("HTTP server failed: {:#}", e);
            }
        }));

        let api = self.api.clone();
        self.background_tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(30));
            info!("Health monitor task started");

            while api.is_running().await {
                interval.tick().await;

                let health = HealthCheck::check(&api).await;
                api.metrics.update_health_status(health.status.as_gauge());
                debug!(
                    "Health check: {} - {} parks",
                    health.status,
                    health
                        .stats
                        .parks
                        .map_or_else(|| "unknown".to_string(), |n| n.to_string())
                );
            }

            info!("Health monitor task stopped");
        }));

        info!("✅ Service started, HTTP on port {}", port);
        Ok(())
    }

    /// Stop accepting requests and wait for background tasks
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown");
        *self.api.is_running.write().await = false;

        self.http_server.stop();

        let timeout = self.config.shutdown_timeout();
        for handle in self.background_tasks.drain(..) {
            let abort = handle.abort_handle();
            match tokio::time::timeout(timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.is_cancelled() => {}
                Ok(Err(e)) => {
                    return Err(ServiceError::BackgroundTask {
                        message: format!("Background task panicked: {}", e),
                    })
                }
                Err(_) => {
                    warn!("Background task did not stop within {:?}, aborting", timeout);
                    abort.abort();
                }
            }
        }

        info!("✅ Shutdown completed");
        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn api_state(&self) -> ApiState {
        self.api.clone()
    }

    pub fn engine(&self) -> &RankingEngine {
        &self.api.engine
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.api.metrics.clone()
    }

    pub async fn is_running(&self) -> bool {
        self.api.is_running().await
    }

    async fn open_store(config: &AppConfig) -> Result<Arc<dyn ParkStore>, ServiceError> {
        match config.storage.backend {
            StorageBackend::Memory => {
                info!("Using in-memory park store");
                Ok(Arc::new(InMemoryParkStore::new()))
            }
            StorageBackend::Sqlite => {
                let path = config.storage.sqlite_path.clone();
                let busy_timeout = config.busy_timeout();
                info!("Opening SQLite park store at {}", path.display());

                let store = tokio::task::spawn_blocking(move || {
                    SqliteParkStore::open(&path, busy_timeout)
                })
                .await
                .map_err(|e| ServiceError::Storage {
                    message: format!("Store initialization task failed: {}", e),
                })?
                .map_err(|e| ServiceError::Storage {
                    message: format!("Failed to open SQLite store: {:#}", e),
                })?;

                Ok(Arc::new(store))
            }
        }
    }

    async fn seed_parks(config: &AppConfig, engine: &RankingEngine) -> Result<(), ServiceError> {
        let parks = config.seed.parks.clone();
        let engine = engine.clone();

        let seeded = tokio::task::spawn_blocking(move || engine.seed(&parks))
            .await
            .map_err(|e| ServiceError::Initialization {
                message: format!("Seed task failed: {}", e),
            })?
            .map_err(|e| ServiceError::Storage {
                message: format!("Failed to seed parks: {:#}", e),
            })?;

        if seeded > 0 {
            info!("Inserted {} seed parks", seeded);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NewPark, ParkIconType};

    fn seeded_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.seed.parks = ["Glacier", "Acadia", "Denali"]
            .iter()
            .map(|name| NewPark {
                name: name.to_string(),
                description: String::new(),
                icon_type: ParkIconType::Mountain,
                image_url: None,
                rating: None,
            })
            .collect();
        config
    }

    #[tokio::test]
    async fn test_new_seeds_memory_store() {
        let state = AppState::new(seeded_config()).await.unwrap();

        assert!(!state.is_running().await);
        let board = state.engine().leaderboard().unwrap();
        assert_eq!(board.len(), 3);
        assert_eq!(state.metrics().votes().parks_total.get(), 3);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = AppConfig::default();
        config.service.http_port = 0;

        let result = AppState::new(config).await;
        assert!(matches!(result, Err(ServiceError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_sqlite_store_keeps_parks_across_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = seeded_config();
        config.storage.backend = StorageBackend::Sqlite;
        config.storage.sqlite_path = dir.path().join("parks.db");

        let first = AppState::new(config.clone()).await.unwrap();
        assert_eq!(first.engine().parks().unwrap().len(), 3);
        drop(first);

        // Seeding is skipped once the store has parks
        let second = AppState::new(config).await.unwrap();
        assert_eq!(second.engine().parks().unwrap().len(), 3);
    }
}
