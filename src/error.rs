//! Error types for the ranking service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application. Domain failures are raised as [`RankingError`] and
//! recovered with `downcast_ref` at the HTTP boundary.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific ranking scenarios
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RankingError {
    #[error("Not enough parks to create a matchup: {count} stored, 2 required")]
    NotEnoughParks { count: usize },

    #[error("Matchup not found: {matchup_id}")]
    MatchupNotFound { matchup_id: i64 },

    #[error("Invalid vote: {reason}")]
    InvalidVote { reason: String },

    #[error("Matchup already resolved: {matchup_id}")]
    AlreadyResolved { matchup_id: i64 },

    #[error("Park not found: {park_id}")]
    ParkNotFound { park_id: i64 },

    #[error("Invalid park: {reason}")]
    InvalidPark { reason: String },

    #[error("Storage unavailable: {message}")]
    StorageUnavailable { message: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl RankingError {
    /// Whether the error is caused by the caller's input rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RankingError::NotEnoughParks { .. }
                | RankingError::MatchupNotFound { .. }
                | RankingError::InvalidVote { .. }
                | RankingError::AlreadyResolved { .. }
                | RankingError::InvalidPark { .. }
        )
    }

    /// Short stable label, used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            RankingError::NotEnoughParks { .. } => "not_enough_parks",
            RankingError::MatchupNotFound { .. } => "matchup_not_found",
            RankingError::InvalidVote { .. } => "invalid_vote",
            RankingError::AlreadyResolved { .. } => "already_resolved",
            RankingError::ParkNotFound { .. } => "park_not_found",
            RankingError::InvalidPark { .. } => "invalid_park",
            RankingError::StorageUnavailable { .. } => "storage_unavailable",
            RankingError::ConfigurationError { .. } => "configuration",
            RankingError::InternalError { .. } => "internal",
        }
    }
}

/// Find the domain error inside an anyhow chain, if there is one
pub fn ranking_error(err: &anyhow::Error) -> Option<&RankingError> {
    err.chain().find_map(|cause| cause.downcast_ref::<RankingError>())
}
