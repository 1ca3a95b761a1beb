//! Vote handling

pub mod processor;

pub use processor::{extend_loss_streak, extend_win_streak, VoteOutcome, VoteProcessor};
