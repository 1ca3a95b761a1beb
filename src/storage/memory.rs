//! In-memory park store
//!
//! Keeps parks and matchups in ordered maps behind a single lock, with
//! auto-incrementing ids starting at 1. Every check runs before the first
//! write, so a failed call leaves the state untouched. The latest resolution
//! is tracked explicitly so it does not depend on clock resolution.

use crate::error::{RankingError, Result};
use crate::rating::assign_ranks;
use crate::storage::ParkStore;
use crate::types::{Matchup, MatchupId, MatchupOutcome, NewPark, Park, ParkId};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug)]
struct StoreState {
    parks: BTreeMap<ParkId, Park>,
    matchups: BTreeMap<MatchupId, Matchup>,
    next_park_id: ParkId,
    next_matchup_id: MatchupId,
    latest_resolved: Option<MatchupId>,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            parks: BTreeMap::new(),
            matchups: BTreeMap::new(),
            next_park_id: 1,
            next_matchup_id: 1,
            latest_resolved: None,
        }
    }
}

impl StoreState {
    fn ensure_parks_exist(&self, parks: &[Park]) -> Result<()> {
        match parks.iter().find(|park| !self.parks.contains_key(&park.id)) {
            Some(missing) => Err(RankingError::ParkNotFound { park_id: missing.id }.into()),
            None => Ok(()),
        }
    }
}

/// In-memory park store implementation
#[derive(Debug, Default)]
pub struct InMemoryParkStore {
    state: RwLock<StoreState>,
}

impl InMemoryParkStore {
    /// Create a new, empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>> {
        self.state.read().map_err(|_| {
            RankingError::InternalError {
                message: "Failed to acquire park store read lock".to_string(),
            }
            .into()
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>> {
        self.state.write().map_err(|_| {
            RankingError::InternalError {
                message: "Failed to acquire park store write lock".to_string(),
            }
            .into()
        })
    }
}

impl ParkStore for InMemoryParkStore {
    fn parks(&self) -> Result<Vec<Park>> {
        let state = self.read()?;
        Ok(state.parks.values().cloned().collect())
    }

    fn park(&self, park_id: ParkId) -> Result<Option<Park>> {
        let state = self.read()?;
        Ok(state.parks.get(&park_id).cloned())
    }

    fn park_count(&self) -> Result<usize> {
        let state = self.read()?;
        Ok(state.parks.len())
    }

    fn insert_park(&self, park: NewPark, rating: i64) -> Result<Park> {
        let mut state = self.write()?;

        if state.parks.values().any(|existing| existing.name == park.name) {
            return Err(RankingError::InvalidPark {
                reason: format!("a park named '{}' already exists", park.name),
            }
            .into());
        }

        let id = state.next_park_id;
        let mut parks: Vec<Park> = state.parks.values().cloned().collect();
        parks.push(Park {
            id,
            name: park.name,
            description: park.description,
            icon_type: park.icon_type,
            image_url: park.image_url,
            rating,
            rank: None,
            trending: false,
            last_change: 0,
        });
        assign_ranks(&mut parks);

        let created = parks
            .iter()
            .find(|park| park.id == id)
            .cloned()
            .ok_or_else(|| RankingError::InternalError {
                message: format!("park {} missing after rank assignment", id),
            })?;

        state.next_park_id += 1;
        for park in parks {
            state.parks.insert(park.id, park);
        }

        Ok(created)
    }

    fn save_parks(&self, parks: &[Park]) -> Result<()> {
        let mut state = self.write()?;
        state.ensure_parks_exist(parks)?;

        for park in parks {
            state.parks.insert(park.id, park.clone());
        }

        Ok(())
    }

    fn insert_matchup(
        &self,
        park1_id: ParkId,
        park2_id: ParkId,
        created_at: DateTime<Utc>,
    ) -> Result<Matchup> {
        if park1_id == park2_id {
            return Err(RankingError::InternalError {
                message: format!("matchup needs two distinct parks, got {} twice", park1_id),
            }
            .into());
        }

        let mut state = self.write()?;

        for park_id in [park1_id, park2_id] {
            if !state.parks.contains_key(&park_id) {
                return Err(RankingError::ParkNotFound { park_id }.into());
            }
        }

        let id = state.next_matchup_id;
        state.next_matchup_id += 1;

        let matchup = Matchup {
            id,
            park1_id,
            park2_id,
            winner_id: None,
            park1_old_rating: None,
            park2_old_rating: None,
            park1_new_rating: None,
            park2_new_rating: None,
            created_at,
            resolved_at: None,
        };
        state.matchups.insert(id, matchup.clone());

        Ok(matchup)
    }

    fn matchup(&self, matchup_id: MatchupId) -> Result<Option<Matchup>> {
        let state = self.read()?;
        Ok(state.matchups.get(&matchup_id).cloned())
    }

    fn resolve_matchup(&self, outcome: &MatchupOutcome, parks: &[Park]) -> Result<Matchup> {
        let mut state = self.write()?;

        // Every check happens before the first write
        let matchup = state
            .matchups
            .get(&outcome.matchup_id)
            .cloned()
            .ok_or(RankingError::MatchupNotFound {
                matchup_id: outcome.matchup_id,
            })?;
        if matchup.is_resolved() {
            return Err(RankingError::AlreadyResolved {
                matchup_id: outcome.matchup_id,
            }
            .into());
        }
        state.ensure_parks_exist(parks)?;

        for park in parks {
            state.parks.insert(park.id, park.clone());
        }

        let resolved = Matchup {
            winner_id: Some(outcome.winner_id),
            park1_old_rating: Some(outcome.park1_old_rating),
            park2_old_rating: Some(outcome.park2_old_rating),
            park1_new_rating: Some(outcome.park1_new_rating),
            park2_new_rating: Some(outcome.park2_new_rating),
            resolved_at: Some(outcome.resolved_at),
            ..matchup
        };
        state.matchups.insert(resolved.id, resolved.clone());
        state.latest_resolved = Some(resolved.id);

        Ok(resolved)
    }

    fn latest_resolved_matchup(&self) -> Result<Option<Matchup>> {
        let state = self.read()?;

        Ok(state
            .latest_resolved
            .and_then(|matchup_id| state.matchups.get(&matchup_id))
            .cloned())
    }
}
