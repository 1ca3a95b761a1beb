//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the park-ranker service using
//! Prometheus metrics.

use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the ranking service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Vote and matchup metrics
    vote_metrics: VoteMetrics,

    /// Performance metrics
    performance_metrics: PerformanceMetrics,

    started_at: Instant,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Component health status
    pub component_health: IntGaugeVec,
}

/// Vote and matchup metrics
#[derive(Clone)]
pub struct VoteMetrics {
    /// Votes processed, labelled by outcome ("accepted" or an error kind)
    pub votes_total: IntCounterVec,

    /// Matchups handed out to voters
    pub matchups_created_total: IntCounter,

    /// Absolute rating change of the winner per accepted vote
    pub rating_swing: Histogram,

    /// Number of parks on the leaderboard
    pub parks_total: IntGauge,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Time spent processing a vote, including the rank recomputation
    pub vote_processing_duration: Histogram,

    /// Time spent selecting and storing a matchup
    pub matchup_creation_duration: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let vote_metrics = VoteMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            vote_metrics,
            performance_metrics,
            started_at: Instant::now(),
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get service metrics
    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    /// Get vote metrics
    pub fn votes(&self) -> &VoteMetrics {
        &self.vote_metrics
    }

    /// Get performance metrics
    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Record a vote that changed ratings
    pub fn record_vote_accepted(&self, winner_swing: i64, duration: Duration) {
        self.vote_metrics
            .votes_total
            .with_label_values(&["accepted"])
            .inc();
        self.vote_metrics
            .rating_swing
            .observe(winner_swing.unsigned_abs() as f64);
        self.performance_metrics
            .vote_processing_duration
            .observe(duration.as_secs_f64());
    }

    /// Record a vote that was rejected or failed
    pub fn record_vote_rejected(&self, kind: &str, duration: Duration) {
        self.vote_metrics
            .votes_total
            .with_label_values(&[kind])
            .inc();
        self.performance_metrics
            .vote_processing_duration
            .observe(duration.as_secs_f64());
    }

    /// Record a matchup being created
    pub fn record_matchup_created(&self, duration: Duration) {
        self.vote_metrics.matchups_created_total.inc();
        self.performance_metrics
            .matchup_creation_duration
            .observe(duration.as_secs_f64());
    }

    /// Update the park count gauge
    pub fn set_park_count(&self, count: usize) {
        self.vote_metrics.parks_total.set(count as i64);
    }

    /// Refresh the uptime gauge
    pub fn update_uptime(&self) {
        self.service_metrics
            .uptime_seconds
            .set(self.started_at.elapsed().as_secs() as i64);
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Update component health
    pub fn update_component_health(&self, component: &str, healthy: bool) {
        let status = if healthy { 1 } else { 0 };
        self.service_metrics
            .component_health
            .with_label_values(&[component])
            .set(status);
    }

    /// Encode every registered metric in the Prometheus text format
    pub fn render(&self) -> Result<String> {
        self.update_uptime();

        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;

        Ok(String::from_utf8(buffer)?)
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("park_ranker_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let health_status = IntGauge::new(
            "park_ranker_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let component_health = IntGaugeVec::new(
            Opts::new("park_ranker_component_health", "Component health status"),
            &["component"],
        )?;
        registry.register(Box::new(component_health.clone()))?;

        Ok(Self {
            uptime_seconds,
            health_status,
            component_health,
        })
    }
}

impl VoteMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let votes_total = IntCounterVec::new(
            Opts::new("park_ranker_votes_total", "Total votes processed"),
            &["outcome"],
        )?;
        registry.register(Box::new(votes_total.clone()))?;

        let matchups_created_total = IntCounter::new(
            "park_ranker_matchups_created_total",
            "Total matchups created",
        )?;
        registry.register(Box::new(matchups_created_total.clone()))?;

        let rating_swing = Histogram::with_opts(
            HistogramOpts::new(
                "park_ranker_rating_swing",
                "Rating points gained by the winner of a vote",
            )
            .buckets(vec![1.0, 2.0, 4.0, 8.0, 12.0, 16.0, 20.0, 24.0, 28.0, 32.0]),
        )?;
        registry.register(Box::new(rating_swing.clone()))?;

        let parks_total = IntGauge::new("park_ranker_parks", "Number of ranked parks")?;
        registry.register(Box::new(parks_total.clone()))?;

        Ok(Self {
            votes_total,
            matchups_created_total,
            rating_swing,
            parks_total,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let vote_processing_duration = Histogram::with_opts(
            HistogramOpts::new(
                "park_ranker_vote_processing_duration_seconds",
                "Time spent processing a vote",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        )?;
        registry.register(Box::new(vote_processing_duration.clone()))?;

        let matchup_creation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "park_ranker_matchup_creation_duration_seconds",
                "Time spent creating a matchup",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25]),
        )?;
        registry.register(Box::new(matchup_creation_duration.clone()))?;

        Ok(Self {
            vote_processing_duration,
            matchup_creation_duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_vote_recording() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.record_vote_accepted(16, Duration::from_millis(2));
        collector.record_vote_accepted(-8, Duration::from_millis(1));
        collector.record_vote_rejected("invalid_vote", Duration::from_micros(300));

        let votes = &collector.votes().votes_total;
        assert_eq!(votes.with_label_values(&["accepted"]).get(), 2);
        assert_eq!(votes.with_label_values(&["invalid_vote"]).get(), 1);
        assert_eq!(collector.votes().rating_swing.get_sample_count(), 2);
        assert_eq!(collector.votes().rating_swing.get_sample_sum(), 24.0);
    }

    #[test]
    fn test_render_contains_registered_metrics() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");
        collector.record_matchup_created(Duration::from_millis(1));
        collector.set_park_count(13);
        collector.update_health_status(2);
        collector.update_component_health("storage", true);

        let text = collector.render().unwrap();
        assert!(text.contains("park_ranker_matchups_created_total 1"));
        assert!(text.contains("park_ranker_parks 13"));
        assert!(text.contains("park_ranker_health_status 2"));
        assert!(text.contains("park_ranker_uptime_seconds"));
    }

    #[test]
    fn test_metrics_timer() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");
        let timer = collector.start_timer();

        std::thread::sleep(Duration::from_millis(10));
        let duration = timer.elapsed();

        assert!(duration >= Duration::from_millis(10));

        let final_duration = timer.stop();
        assert!(final_duration >= Duration::from_millis(10));
    }
}
