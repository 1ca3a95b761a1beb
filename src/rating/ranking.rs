//! Leaderboard rank assignment
//!
//! Ranks are derived state: they are recomputed from ratings after every
//! rating-affecting mutation and never edited on their own.

use crate::error::Result;
use crate::storage::ParkStore;
use crate::types::{Park, ParkId, RankedPark};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Leaderboard order: rating descending, then park id ascending
pub fn leaderboard_order(a: &Park, b: &Park) -> Ordering {
    b.rating.cmp(&a.rating).then_with(|| a.id.cmp(&b.id))
}

/// Sort parks into leaderboard order and assign 1-based ranks.
///
/// After this call `parks[i].rank == Some(i + 1)`.
pub fn assign_ranks(parks: &mut [Park]) {
    parks.sort_by(leaderboard_order);

    for (index, park) in parks.iter_mut().enumerate() {
        park.rank = Some(index as u32 + 1);
    }
}

/// Turn stored parks into leaderboard rows ordered by rank.
///
/// Parks that have never been ranked sort last.
pub fn to_leaderboard(mut parks: Vec<Park>) -> Vec<RankedPark> {
    parks.sort_by(|a, b| match (a.rank, b.rank) {
        (Some(a_rank), Some(b_rank)) => a_rank.cmp(&b_rank),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    });

    parks.into_iter().map(RankedPark::from).collect()
}

/// Ranks for the whole leaderboard after applying a set of park updates
#[derive(Debug, Clone, PartialEq)]
pub struct RankPlan {
    /// Every park, in leaderboard order with fresh ranks
    pub ranked: Vec<Park>,
    /// Parks whose stored state differs from `ranked`
    pub changed: Vec<Park>,
}

/// Recomputes and persists ranks for every stored park
#[derive(Clone)]
pub struct RankingAssigner {
    store: Arc<dyn ParkStore>,
}

impl RankingAssigner {
    pub fn new(store: Arc<dyn ParkStore>) -> Self {
        Self { store }
    }

    /// Rank the stored parks as if `updated` had already been saved.
    ///
    /// Nothing is written; callers commit `changed` together with whatever
    /// caused the update.
    pub fn plan(&self, updated: &[Park]) -> Result<RankPlan> {
        let stored = self.store.parks()?;
        let previous: HashMap<ParkId, Park> = stored
            .iter()
            .map(|park| (park.id, park.clone()))
            .collect();

        let mut parks = stored;
        for update in updated {
            match parks.iter_mut().find(|park| park.id == update.id) {
                Some(slot) => *slot = update.clone(),
                None => parks.push(update.clone()),
            }
        }

        assign_ranks(&mut parks);

        let changed: Vec<Park> = parks
            .iter()
            .filter(|park| previous.get(&park.id) != Some(*park))
            .cloned()
            .collect();

        Ok(RankPlan {
            ranked: parks,
            changed,
        })
    }

    /// Reassign ranks for all parks and persist the ones that moved.
    ///
    /// Callers must hold the engine's update lock so no rating changes
    /// between the read and the write.
    pub fn recompute_ranks(&self) -> Result<Vec<Park>> {
        let plan = self.plan(&[])?;

        if !plan.changed.is_empty() {
            debug!("Persisting {} rank changes", plan.changed.len());
            self.store.save_parks(&plan.changed)?;
        }

        Ok(plan.ranked)
    }
}
