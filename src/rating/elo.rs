//! ELO rating updates for pairwise votes
//!
//! The logistic update itself comes from the skillratings crate; this module
//! adds integer rounding and the configuration the service runs with.

use crate::config::RatingConfig;
use serde::{Deserialize, Serialize};
use skillratings::elo::{elo, EloConfig, EloRating};
use skillratings::Outcomes;

/// Default maximum rating swing per comparison
pub const DEFAULT_K_FACTOR: f64 = 32.0;

/// Round to the nearest integer, half-way values toward positive infinity
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Compute new ratings for the winner and loser of a single comparison.
///
/// Both results are rounded independently, so the winner's gain and the
/// loser's loss may differ by one point. Ratings are not clamped.
pub fn update_ratings(winner_rating: i64, loser_rating: i64, k_factor: f64) -> (i64, i64) {
    let winner = EloRating {
        rating: winner_rating as f64,
    };
    let loser = EloRating {
        rating: loser_rating as f64,
    };

    let (winner_new, loser_new) = elo(&winner, &loser, &Outcomes::WIN, &EloConfig { k: k_factor });

    (round_half_up(winner_new.rating), round_half_up(loser_new.rating))
}

/// Rating movement of both participants in one vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingUpdate {
    pub winner_old: i64,
    pub winner_new: i64,
    pub loser_old: i64,
    pub loser_new: i64,
}

impl RatingUpdate {
    pub fn winner_delta(&self) -> i64 {
        self.winner_new - self.winner_old
    }

    pub fn loser_delta(&self) -> i64 {
        self.loser_new - self.loser_old
    }
}

/// ELO calculator bound to the service's rating configuration
#[derive(Debug, Clone)]
pub struct EloCalculator {
    config: RatingConfig,
}

impl EloCalculator {
    /// Create a new calculator, rejecting invalid parameters
    pub fn new(config: RatingConfig) -> crate::error::Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RatingConfig {
        &self.config
    }

    /// Apply a win of `winner_rating` over `loser_rating`
    pub fn rate(&self, winner_rating: i64, loser_rating: i64) -> RatingUpdate {
        let (winner_new, loser_new) =
            update_ratings(winner_rating, loser_rating, self.config.k_factor);

        RatingUpdate {
            winner_old: winner_rating,
            winner_new,
            loser_old: loser_rating,
            loser_new,
        }
    }
}

impl Default for EloCalculator {
    fn default() -> Self {
        Self {
            config: RatingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_equal_ratings_split_k_evenly() {
        assert_eq!(update_ratings(1500, 1500, 32.0), (1516, 1484));
    }

    #[test]
    fn test_large_gap_uses_exact_formula() {
        // expected winner score = 1 / (1 + 10^(-0.5)) ~ 0.7597
        let expected_winner = 1.0 / (1.0 + 10f64.powf((1400.0 - 1600.0) / 400.0));
        let winner = 1600.0 + 32.0 * (1.0 - expected_winner);
        let loser = 1400.0 - 32.0 * (1.0 - expected_winner);

        let (winner_new, loser_new) = update_ratings(1600, 1400, 32.0);
        assert_eq!(winner_new, winner.round() as i64);
        assert_eq!(loser_new, loser.round() as i64);
        assert_eq!((winner_new, loser_new), (1608, 1392));
    }

    #[test]
    fn test_upset_moves_ratings_further() {
        let (winner_new, loser_new) = update_ratings(1400, 1600, 32.0);
        assert_eq!((winner_new, loser_new), (1424, 1576));
    }

    #[test]
    fn test_custom_k_factor() {
        assert_eq!(update_ratings(1500, 1500, 16.0), (1508, 1492));
    }

    #[test]
    fn test_negative_ratings_are_not_clamped() {
        let (_, loser_new) = update_ratings(10, 5, 32.0);
        assert!(loser_new < 0);
    }

    #[test]
    fn test_half_values_round_up() {
        assert_eq!(round_half_up(1507.5), 1508);
        assert_eq!(round_half_up(-3.5), -3);
        assert_eq!(round_half_up(1392.4), 1392);
    }

    #[test]
    fn test_calculator_reports_deltas() {
        let calculator = EloCalculator::default();
        let update = calculator.rate(1500, 1500);

        assert_eq!(update.winner_delta(), 16);
        assert_eq!(update.loser_delta(), -16);
    }

    #[test]
    fn test_calculator_rejects_bad_config() {
        let config = RatingConfig {
            k_factor: -4.0,
            ..Default::default()
        };
        assert!(EloCalculator::new(config).is_err());
    }

    proptest! {
        #[test]
        fn favored_winner_never_drops(
            loser in 0i64..3000,
            gap in 0i64..1000,
            k in 1.0f64..64.0,
        ) {
            let winner = loser + gap;
            let (winner_new, loser_new) = update_ratings(winner, loser, k);
            prop_assert!(winner_new >= winner - 1);
            prop_assert!(loser_new <= loser);
        }

        #[test]
        fn equal_ratings_move_by_half_k(rating in -500i64..4000, k in 1.0f64..64.0) {
            let (winner_new, loser_new) = update_ratings(rating, rating, k);
            let half = k / 2.0;
            prop_assert!(((winner_new - rating) as f64 - half).abs() <= 1.0);
            prop_assert!(((rating - loser_new) as f64 - half).abs() <= 1.0);
        }

        #[test]
        fn gain_and_loss_differ_by_at_most_one(
            winner in 0i64..3000,
            loser in 0i64..3000,
        ) {
            let (winner_new, loser_new) = update_ratings(winner, loser, DEFAULT_K_FACTOR);
            let gain = winner_new - winner;
            let loss = loser - loser_new;
            prop_assert!((gain - loss).abs() <= 1);
        }
    }
}
