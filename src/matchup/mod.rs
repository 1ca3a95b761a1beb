//! Matchup creation and results
//!
//! This module picks the parks voters compare and reports the outcome of
//! the most recent vote.

pub mod result;
pub mod selector;

// Re-export commonly used types
pub use result::latest_vote_result;
pub use selector::{pick_distinct_pair, MatchupSelector};
