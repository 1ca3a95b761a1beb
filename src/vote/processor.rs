//! Vote processing
//!
//! A vote resolves one pending matchup: both ratings are updated with the
//! ELO rule, streak and trending flags are refreshed, ranks are recomputed
//! and everything is committed to the store in a single operation.

use crate::engine::UpdateLock;
use crate::error::{RankingError, Result};
use crate::rating::{to_leaderboard, EloCalculator, RankingAssigner, RatingUpdate};
use crate::storage::ParkStore;
use crate::types::{Matchup, MatchupOutcome, Park, ParkId, RankedPark, Vote};
use crate::utils::{current_timestamp, is_trending_swing};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Streak after a win: extends a winning run, otherwise starts a new one
pub fn extend_win_streak(previous: i64) -> i64 {
    if previous > 0 {
        previous + 1
    } else {
        1
    }
}

/// Streak after a loss: extends a losing run, otherwise starts a new one
pub fn extend_loss_streak(previous: i64) -> i64 {
    if previous < 0 {
        previous - 1
    } else {
        -1
    }
}

/// Result of an accepted vote
#[derive(Debug, Clone, PartialEq)]
pub struct VoteOutcome {
    /// The matchup as stored after resolution
    pub matchup: Matchup,
    /// Rating movement of winner and loser
    pub update: RatingUpdate,
    /// Full leaderboard after the vote
    pub rankings: Vec<RankedPark>,
}

/// Validates votes and applies them to the store
#[derive(Clone)]
pub struct VoteProcessor {
    store: Arc<dyn ParkStore>,
    calculator: EloCalculator,
    ranking: RankingAssigner,
    update_lock: Arc<UpdateLock>,
}

impl VoteProcessor {
    pub fn new(
        store: Arc<dyn ParkStore>,
        calculator: EloCalculator,
        update_lock: Arc<UpdateLock>,
    ) -> Self {
        let ranking = RankingAssigner::new(store.clone());

        Self {
            store,
            calculator,
            ranking,
            update_lock,
        }
    }

    /// Apply a vote and return the refreshed leaderboard.
    ///
    /// On any error the store is left exactly as it was.
    pub fn submit_vote(&self, vote: Vote) -> Result<VoteOutcome> {
        let _guard = self.update_lock.acquire();

        let matchup = self
            .store
            .matchup(vote.matchup_id)?
            .ok_or(RankingError::MatchupNotFound {
                matchup_id: vote.matchup_id,
            })?;

        if !matchup.involves(vote.winner_id) {
            warn!(
                "Rejected vote for park {} on matchup {} ({} vs {})",
                vote.winner_id, matchup.id, matchup.park1_id, matchup.park2_id
            );
            return Err(RankingError::InvalidVote {
                reason: format!(
                    "park {} is not part of matchup {}",
                    vote.winner_id, matchup.id
                ),
            }
            .into());
        }

        if matchup.is_resolved() {
            return Err(RankingError::AlreadyResolved {
                matchup_id: matchup.id,
            }
            .into());
        }

        let park1 = self.load_park(matchup.park1_id)?;
        let park2 = self.load_park(matchup.park2_id)?;
        let (winner, loser) = if vote.winner_id == park1.id {
            (park1, park2)
        } else {
            (park2, park1)
        };

        let update = self.calculator.rate(winner.rating, loser.rating);
        debug!(
            "Matchup {}: winner {} -> {}, loser {} -> {}",
            matchup.id, update.winner_old, update.winner_new, update.loser_old, update.loser_new
        );

        let threshold = self.calculator.config().trending_threshold;
        let winner = Park {
            rating: update.winner_new,
            trending: is_trending_swing(update.winner_old, update.winner_new, threshold),
            last_change: extend_win_streak(winner.last_change),
            ..winner
        };
        let loser = Park {
            rating: update.loser_new,
            trending: is_trending_swing(update.loser_old, update.loser_new, threshold),
            last_change: extend_loss_streak(loser.last_change),
            ..loser
        };

        let outcome = positional_outcome(&matchup, winner.id, &update);
        let plan = self.ranking.plan(&[winner.clone(), loser.clone()])?;

        let resolved = self.store.resolve_matchup(&outcome, &plan.changed)?;

        info!(
            "Vote recorded on matchup {}: '{}' ({}) beat '{}' ({})",
            resolved.id, winner.name, update.winner_new, loser.name, update.loser_new
        );

        Ok(VoteOutcome {
            matchup: resolved,
            update,
            rankings: to_leaderboard(plan.ranked),
        })
    }

    fn load_park(&self, park_id: ParkId) -> Result<Park> {
        self.store
            .park(park_id)?
            .ok_or_else(|| RankingError::ParkNotFound { park_id }.into())
    }
}

/// Map a winner/loser rating update back onto the matchup's park1/park2 slots
fn positional_outcome(matchup: &Matchup, winner_id: ParkId, update: &RatingUpdate) -> MatchupOutcome {
    let winner_is_park1 = winner_id == matchup.park1_id;
    let (park1_old_rating, park1_new_rating, park2_old_rating, park2_new_rating) =
        if winner_is_park1 {
            (update.winner_old, update.winner_new, update.loser_old, update.loser_new)
        } else {
            (update.loser_old, update.loser_new, update.winner_old, update.winner_new)
        };

    MatchupOutcome {
        matchup_id: matchup.id,
        winner_id,
        park1_old_rating,
        park2_old_rating,
        park1_new_rating,
        park2_new_rating,
        resolved_at: current_timestamp(),
    }
}
