//! Rating and ranking
//!
//! This module provides the ELO update applied after each vote and the
//! rank assignment that turns ratings into a leaderboard.

pub mod elo;
pub mod ranking;

// Re-export commonly used types
pub use elo::{update_ratings, EloCalculator, RatingUpdate, DEFAULT_K_FACTOR};
pub use ranking::{assign_ranks, to_leaderboard, RankPlan, RankingAssigner};
