//! Test fixtures shared by the integration tests

#![allow(dead_code)]

use park_ranker::config::RatingConfig;
use park_ranker::error::{RankingError, Result};
use park_ranker::storage::{InMemoryParkStore, ParkStore};
use park_ranker::types::{Matchup, MatchupOutcome, NewPark, Park, ParkIconType, ParkId};
use park_ranker::RankingEngine;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A park request with only a name filled in
pub fn new_park(name: &str) -> NewPark {
    NewPark {
        name: name.to_string(),
        description: format!("{} National Park", name),
        icon_type: ParkIconType::Mountain,
        image_url: None,
        rating: None,
    }
}

/// Engine over a fresh in-memory store holding the named parks at 1500
pub fn engine_with_parks(names: &[&str]) -> (Arc<InMemoryParkStore>, RankingEngine) {
    let store = Arc::new(InMemoryParkStore::new());
    let engine = RankingEngine::new(store.clone(), RatingConfig::default()).unwrap();
    for name in names {
        engine.create_park(new_park(name)).unwrap();
    }
    (store, engine)
}

/// Store wrapper whose writes can be switched to fail
#[derive(Default)]
pub struct FlakyParkStore {
    inner: InMemoryParkStore,
    fail_writes: AtomicBool,
}

impl FlakyParkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every park and matchup write fail until switched back
    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RankingError::StorageUnavailable {
                message: "disk unavailable".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl ParkStore for FlakyParkStore {
    fn parks(&self) -> Result<Vec<Park>> {
        self.inner.parks()
    }

    fn park(&self, park_id: ParkId) -> Result<Option<Park>> {
        self.inner.park(park_id)
    }

    fn park_count(&self) -> Result<usize> {
        self.inner.park_count()
    }

    fn insert_park(&self, park: NewPark, rating: i64) -> Result<Park> {
        self.check_writable()?;
        self.inner.insert_park(park, rating)
    }

    fn save_parks(&self, parks: &[Park]) -> Result<()> {
        self.check_writable()?;
        self.inner.save_parks(parks)
    }

    fn insert_matchup(
        &self,
        park1_id: ParkId,
        park2_id: ParkId,
        created_at: DateTime<Utc>,
    ) -> Result<Matchup> {
        self.inner.insert_matchup(park1_id, park2_id, created_at)
    }

    fn matchup(&self, matchup_id: i64) -> Result<Option<Matchup>> {
        self.inner.matchup(matchup_id)
    }

    fn resolve_matchup(&self, outcome: &MatchupOutcome, parks: &[Park]) -> Result<Matchup> {
        self.check_writable()?;
        self.inner.resolve_matchup(outcome, parks)
    }

    fn latest_resolved_matchup(&self) -> Result<Option<Matchup>> {
        self.inner.latest_resolved_matchup()
    }
}
