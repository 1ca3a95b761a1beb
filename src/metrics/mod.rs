//! Metrics and monitoring for the park-ranker service
//!
//! This module provides Prometheus metrics collection for votes, matchups
//! and service health.

pub mod collector;

pub use collector::{MetricsCollector, MetricsTimer, PerformanceMetrics, ServiceMetrics, VoteMetrics};
