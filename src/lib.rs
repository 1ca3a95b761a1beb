//! Park Ranker - pairwise-vote ELO ranking service
//!
//! Voters are shown two random parks and pick the better one. Each vote
//! updates both ratings with the ELO rule and reranks the leaderboard.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod matchup;
pub mod metrics;
pub mod rating;
pub mod service;
pub mod storage;
pub mod types;
pub mod utils;
pub mod vote;

// Re-export commonly used types and traits
pub use error::{RankingError, Result};
pub use types::*;

// Re-export key components
pub use engine::RankingEngine;
pub use storage::{InMemoryParkStore, ParkStore, SqliteParkStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
