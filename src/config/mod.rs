//! Configuration management for the park-ranker service
//!
//! This module handles configuration loading from environment variables and
//! TOML files, validation, and default values for the ranking service.

pub mod app;
pub mod rating;

// Re-export commonly used types
pub use app::{
    validate_config, AppConfig, SeedSettings, ServiceSettings, StorageBackend, StorageSettings,
};
pub use rating::RatingConfig;
