//! Park and matchup persistence
//!
//! The engine only talks to the [`ParkStore`] trait. Two backends are provided:
//! an in-memory store for tests and single-process deployments, and a
//! transactional SQLite store.

pub mod memory;
pub mod sqlite;

use crate::error::Result;
use crate::types::{Matchup, MatchupId, MatchupOutcome, NewPark, Park, ParkId};
use chrono::{DateTime, Utc};

pub use memory::InMemoryParkStore;
pub use sqlite::SqliteParkStore;

/// Trait for park and matchup storage operations
pub trait ParkStore: Send + Sync {
    /// All parks, ordered by id
    fn parks(&self) -> Result<Vec<Park>>;

    /// Get a single park
    fn park(&self, park_id: ParkId) -> Result<Option<Park>>;

    /// Number of stored parks
    fn park_count(&self) -> Result<usize>;

    /// Insert a park with the given starting rating, assigning a fresh id,
    /// and rerank every park in the same atomic write.
    ///
    /// Returns the new park with its rank. Fails with `InvalidPark` when the
    /// name is already taken; on any failure nothing is written.
    fn insert_park(&self, park: NewPark, rating: i64) -> Result<Park>;

    /// Overwrite existing parks atomically.
    ///
    /// Fails with `ParkNotFound` without writing anything when any park is missing.
    fn save_parks(&self, parks: &[Park]) -> Result<()>;

    /// Append a new unresolved matchup
    fn insert_matchup(
        &self,
        park1_id: ParkId,
        park2_id: ParkId,
        created_at: DateTime<Utc>,
    ) -> Result<Matchup>;

    /// Get a single matchup
    fn matchup(&self, matchup_id: MatchupId) -> Result<Option<Matchup>>;

    /// Record a vote outcome and the updated parks as one atomic unit.
    ///
    /// The matchup must still be unresolved when the write happens; otherwise
    /// the call fails with `AlreadyResolved` and nothing is written.
    fn resolve_matchup(&self, outcome: &MatchupOutcome, parks: &[Park]) -> Result<Matchup>;

    /// The most recently resolved matchup, if any vote was ever recorded
    fn latest_resolved_matchup(&self) -> Result<Option<Matchup>>;
}
