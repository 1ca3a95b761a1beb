//! Rating system configuration

use crate::rating::DEFAULT_K_FACTOR;
use crate::types::{DEFAULT_RATING, RATING_BOUNDS};
use serde::{Deserialize, Serialize};

/// Parameters of the ELO update and the trending flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    /// Maximum rating swing per comparison
    pub k_factor: f64,
    /// Rating given to parks created without one
    pub default_rating: i64,
    /// A park is trending when its last swing is strictly larger than this
    pub trending_threshold: i64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            k_factor: DEFAULT_K_FACTOR,
            default_rating: DEFAULT_RATING,
            trending_threshold: 10,
        }
    }
}

impl RatingConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> crate::error::Result<()> {
        if !self.k_factor.is_finite() || self.k_factor <= 0.0 {
            return Err(crate::error::RankingError::ConfigurationError {
                message: format!("K-factor must be positive, got {}", self.k_factor),
            }
            .into());
        }

        if !RATING_BOUNDS.contains(&self.default_rating) {
            return Err(crate::error::RankingError::ConfigurationError {
                message: format!(
                    "Default rating must be within {}..={}, got {}",
                    RATING_BOUNDS.start(),
                    RATING_BOUNDS.end(),
                    self.default_rating
                ),
            }
            .into());
        }

        if self.trending_threshold < 0 {
            return Err(crate::error::RankingError::ConfigurationError {
                message: "Trending threshold must be non-negative".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
