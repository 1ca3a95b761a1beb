//! Utility functions for the ranking service

use chrono::{DateTime, Utc};

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Calculate the absolute difference between two ratings
pub fn rating_difference(rating1: i64, rating2: i64) -> i64 {
    (rating1 - rating2).abs()
}

/// Check if a rating swing is large enough to mark a park as trending
pub fn is_trending_swing(old_rating: i64, new_rating: i64, threshold: i64) -> bool {
    rating_difference(old_rating, new_rating) > threshold
}
