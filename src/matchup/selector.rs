//! Random matchup selection
//!
//! Two distinct parks are drawn uniformly at random. The second index is
//! drawn from the N-1 remaining slots and shifted past the first one, so a
//! distinct pair is always found in constant time.

use crate::error::{RankingError, Result};
use crate::storage::ParkStore;
use crate::types::CurrentMatchup;
use crate::utils::current_timestamp;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info};

/// Draw two distinct indices in `[0, count)`, or `None` when `count < 2`
pub fn pick_distinct_pair<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Option<(usize, usize)> {
    if count < 2 {
        return None;
    }

    let first = rng.gen_range(0..count);
    let mut second = rng.gen_range(0..count - 1);
    if second >= first {
        second += 1;
    }

    Some((first, second))
}

/// Creates and persists pending matchups
#[derive(Clone)]
pub struct MatchupSelector {
    store: Arc<dyn ParkStore>,
}

impl MatchupSelector {
    pub fn new(store: Arc<dyn ParkStore>) -> Self {
        Self { store }
    }

    /// Create a matchup between two random parks using the thread-local RNG
    pub fn create_random_matchup(&self) -> Result<CurrentMatchup> {
        self.create_matchup_with(&mut rand::thread_rng())
    }

    /// Create a matchup drawing from the given RNG
    pub fn create_matchup_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<CurrentMatchup> {
        let parks = self.store.parks()?;

        let (first, second) =
            pick_distinct_pair(parks.len(), rng).ok_or(RankingError::NotEnoughParks {
                count: parks.len(),
            })?;
        debug!(
            "Selected indices {} and {} out of {} parks",
            first,
            second,
            parks.len()
        );

        let park1 = parks[first].clone();
        let park2 = parks[second].clone();
        let matchup = self
            .store
            .insert_matchup(park1.id, park2.id, current_timestamp())?;

        info!(
            "Created matchup {}: '{}' vs '{}'",
            matchup.id, park1.name, park2.name
        );

        Ok(CurrentMatchup {
            id: matchup.id,
            park1,
            park2,
        })
    }
}
