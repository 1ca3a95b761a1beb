//! Ranking engine
//!
//! The engine ties the store, the ELO calculator, matchup selection and vote
//! processing together behind one type. Every rating or rank mutation goes
//! through the shared [`UpdateLock`], so rank assignment always sees a
//! consistent set of ratings. Matchup creation only appends and does not
//! take the lock.

use crate::config::RatingConfig;
use crate::error::{RankingError, Result};
use crate::matchup::{latest_vote_result, MatchupSelector};
use crate::metrics::MetricsCollector;
use crate::rating::{to_leaderboard, EloCalculator, RankingAssigner};
use crate::storage::ParkStore;
use crate::types::{
    CurrentMatchup, LatestVoteResult, NewPark, Park, ParkId, RankedPark, Vote, RATING_BOUNDS,
};
use crate::vote::{VoteOutcome, VoteProcessor};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Serializes every rating and rank mutation
#[derive(Debug, Default)]
pub struct UpdateLock(Mutex<()>);

impl UpdateLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until no other mutation is in flight.
    ///
    /// The lock guards no data of its own, so a poisoned lock is still safe
    /// to reuse.
    pub fn acquire(&self) -> MutexGuard<'_, ()> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Reject ratings outside [`RATING_BOUNDS`]
fn check_rating(rating: i64) -> Result<()> {
    if RATING_BOUNDS.contains(&rating) {
        return Ok(());
    }
    Err(RankingError::InvalidPark {
        reason: format!(
            "rating {} is outside {}..={}",
            rating,
            RATING_BOUNDS.start(),
            RATING_BOUNDS.end()
        ),
    }
    .into())
}

/// Entry point for every ranking operation
#[derive(Clone)]
pub struct RankingEngine {
    store: Arc<dyn ParkStore>,
    calculator: EloCalculator,
    selector: MatchupSelector,
    processor: VoteProcessor,
    ranking: RankingAssigner,
    update_lock: Arc<UpdateLock>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl RankingEngine {
    /// Create an engine over `store`, rejecting an invalid rating config
    pub fn new(store: Arc<dyn ParkStore>, config: RatingConfig) -> Result<Self> {
        let calculator = EloCalculator::new(config)?;
        let update_lock = Arc::new(UpdateLock::new());

        Ok(Self {
            selector: MatchupSelector::new(store.clone()),
            processor: VoteProcessor::new(store.clone(), calculator.clone(), update_lock.clone()),
            ranking: RankingAssigner::new(store.clone()),
            store,
            calculator,
            update_lock,
            metrics: None,
        })
    }

    /// Record vote and matchup metrics into `metrics`
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn store(&self) -> Arc<dyn ParkStore> {
        self.store.clone()
    }

    pub fn rating_config(&self) -> &RatingConfig {
        self.calculator.config()
    }

    /// All parks ordered by rank
    pub fn leaderboard(&self) -> Result<Vec<RankedPark>> {
        Ok(to_leaderboard(self.store.parks()?))
    }

    /// All parks ordered by id
    pub fn parks(&self) -> Result<Vec<Park>> {
        self.store.parks()
    }

    pub fn park(&self, park_id: ParkId) -> Result<Park> {
        self.store
            .park(park_id)?
            .ok_or_else(|| RankingError::ParkNotFound { park_id }.into())
    }

    /// Add a park and rerank the leaderboard.
    ///
    /// The insert and the new ranks are one store write, so a failed creation
    /// leaves no unranked park behind.
    pub fn create_park(&self, mut park: NewPark) -> Result<Park> {
        park.name = park.name.trim().to_string();
        if park.name.is_empty() {
            return Err(RankingError::InvalidPark {
                reason: "park name must not be empty".to_string(),
            }
            .into());
        }
        let rating = park
            .rating
            .unwrap_or(self.calculator.config().default_rating);
        check_rating(rating)?;

        let _guard = self.update_lock.acquire();
        let created = self.store.insert_park(park, rating)?;

        match self.store.park_count() {
            Ok(count) => self.refresh_park_count(count),
            Err(e) => warn!("Failed to count parks after insert: {}", e),
        }

        info!(
            "Created park {} '{}' at rating {}, rank {:?}",
            created.id, created.name, created.rating, created.rank
        );

        Ok(created)
    }

    /// Overwrite a park's rating and rerank.
    ///
    /// Streak and trending flags are left alone; they only follow votes.
    pub fn set_park_rating(&self, park_id: ParkId, rating: i64) -> Result<Park> {
        check_rating(rating)?;
        let _guard = self.update_lock.acquire();

        let park = self.park(park_id)?;
        let previous = park.rating;
        let updated = Park { rating, ..park };

        let plan = self.ranking.plan(&[updated])?;
        self.store.save_parks(&plan.changed)?;

        info!(
            "Park {} rating set from {} to {}",
            park_id, previous, rating
        );

        plan.ranked
            .into_iter()
            .find(|park| park.id == park_id)
            .ok_or_else(|| RankingError::ParkNotFound { park_id }.into())
    }

    /// Hand out a new pending matchup between two random parks
    pub fn create_random_matchup(&self) -> Result<CurrentMatchup> {
        let timer = self.metrics.as_ref().map(|metrics| metrics.start_timer());
        let matchup = self.selector.create_random_matchup()?;

        if let (Some(metrics), Some(timer)) = (&self.metrics, timer) {
            metrics.record_matchup_created(timer.stop());
        }

        Ok(matchup)
    }

    /// Apply a vote and return the refreshed leaderboard
    pub fn submit_vote(&self, vote: Vote) -> Result<VoteOutcome> {
        let timer = self.metrics.as_ref().map(|metrics| metrics.start_timer());
        let result = self.processor.submit_vote(vote);

        if let (Some(metrics), Some(timer)) = (&self.metrics, timer) {
            let elapsed = timer.stop();
            match &result {
                Ok(outcome) => metrics.record_vote_accepted(outcome.update.winner_delta(), elapsed),
                Err(e) => {
                    let kind = crate::error::ranking_error(e)
                        .map(RankingError::kind)
                        .unwrap_or("internal");
                    metrics.record_vote_rejected(kind, elapsed);
                }
            }
        }

        if let Err(e) = &result {
            debug!("Vote on matchup {} failed: {}", vote.matchup_id, e);
        }

        result
    }

    /// The most recently resolved matchup, if any vote has been cast
    pub fn latest_result(&self) -> Result<Option<LatestVoteResult>> {
        latest_vote_result(self.store.as_ref())
    }

    /// Insert `parks` when the store has no parks yet.
    ///
    /// A store that already holds parks gets its ranks recomputed instead, so
    /// ratings edited outside the service show up on the leaderboard. Returns
    /// how many parks were inserted.
    pub fn seed(&self, parks: &[NewPark]) -> Result<usize> {
        let existing = self.store.park_count()?;
        if existing > 0 {
            debug!("Store already holds {} parks, skipping seed", existing);
            let _guard = self.update_lock.acquire();
            let ranked = self.ranking.recompute_ranks()?;
            self.refresh_park_count(ranked.len());
            return Ok(0);
        }

        for park in parks {
            self.create_park(park.clone())?;
        }

        if !parks.is_empty() {
            info!("Seeded {} parks", parks.len());
        } else {
            warn!("Store is empty and no seed parks are configured");
        }

        Ok(parks.len())
    }

    fn refresh_park_count(&self, count: usize) {
        if let Some(metrics) = &self.metrics {
            metrics.set_park_count(count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ranking_error;
    use crate::storage::InMemoryParkStore;
    use crate::types::ParkIconType;

    fn new_park(name: &str) -> NewPark {
        NewPark {
            name: name.to_string(),
            description: format!("{} description", name),
            icon_type: ParkIconType::Volcanic,
            image_url: None,
            rating: None,
        }
    }

    fn engine() -> RankingEngine {
        RankingEngine::new(Arc::new(InMemoryParkStore::new()), RatingConfig::default()).unwrap()
    }

    #[test]
    fn test_create_park_assigns_rank() {
        let engine = engine();
        let first = engine.create_park(new_park("Arches")).unwrap();
        assert_eq!(first.rating, 1500);
        assert_eq!(first.rank, Some(1));

        let second = engine
            .create_park(NewPark {
                rating: Some(1600),
                ..new_park("Bryce Canyon")
            })
            .unwrap();
        assert_eq!(second.rank, Some(1));
        assert_eq!(engine.park(first.id).unwrap().rank, Some(2));
    }

    #[test]
    fn test_create_park_rejects_blank_name() {
        let engine = engine();
        let err = engine.create_park(new_park("   ")).unwrap_err();
        assert!(matches!(
            ranking_error(&err),
            Some(RankingError::InvalidPark { .. })
        ));
        assert!(engine.parks().unwrap().is_empty());
    }

    #[test]
    fn test_set_park_rating_reranks_without_touching_streak() {
        let engine = engine();
        let a = engine.create_park(new_park("Arches")).unwrap();
        let b = engine.create_park(new_park("Bryce Canyon")).unwrap();
        assert_eq!(engine.park(b.id).unwrap().rank, Some(2));

        let updated = engine.set_park_rating(b.id, 1700).unwrap();
        assert_eq!(updated.rank, Some(1));
        assert_eq!(updated.last_change, 0);
        assert!(!updated.trending);
        assert_eq!(engine.park(a.id).unwrap().rank, Some(2));

        let err = engine.set_park_rating(99, 1400).unwrap_err();
        assert_eq!(
            ranking_error(&err),
            Some(&RankingError::ParkNotFound { park_id: 99 })
        );
    }

    #[test]
    fn test_ratings_outside_bounds_rejected() {
        let engine = engine();
        let park = engine.create_park(new_park("Arches")).unwrap();

        for rating in [i64::MIN, -1, *RATING_BOUNDS.end() + 1, i64::MAX] {
            let err = engine.set_park_rating(park.id, rating).unwrap_err();
            assert!(matches!(
                ranking_error(&err),
                Some(RankingError::InvalidPark { .. })
            ));

            let err = engine
                .create_park(NewPark {
                    rating: Some(rating),
                    ..new_park("Bryce Canyon")
                })
                .unwrap_err();
            assert!(matches!(
                ranking_error(&err),
                Some(RankingError::InvalidPark { .. })
            ));
        }

        assert_eq!(engine.park(park.id).unwrap().rating, 1500);
        assert_eq!(engine.parks().unwrap().len(), 1);
        assert_eq!(
            engine.set_park_rating(park.id, 0).unwrap().rating,
            *RATING_BOUNDS.start()
        );
    }

    #[test]
    fn test_vote_records_metrics() {
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let engine = engine().with_metrics(metrics.clone());
        engine.create_park(new_park("Arches")).unwrap();
        engine.create_park(new_park("Bryce Canyon")).unwrap();

        let matchup = engine.create_random_matchup().unwrap();
        engine
            .submit_vote(Vote {
                matchup_id: matchup.id,
                winner_id: matchup.park1.id,
            })
            .unwrap();
        engine
            .submit_vote(Vote {
                matchup_id: matchup.id,
                winner_id: matchup.park2.id,
            })
            .unwrap_err();

        let votes = &metrics.votes().votes_total;
        assert_eq!(votes.with_label_values(&["accepted"]).get(), 1);
        assert_eq!(votes.with_label_values(&["already_resolved"]).get(), 1);
        assert_eq!(metrics.votes().matchups_created_total.get(), 1);
        assert_eq!(metrics.votes().parks_total.get(), 2);
    }

    #[test]
    fn test_seed_only_fills_empty_store() {
        let engine = engine();
        let parks = vec![new_park("Arches"), new_park("Zion"), new_park("Olympic")];

        assert_eq!(engine.seed(&parks).unwrap(), 3);
        assert_eq!(engine.seed(&parks).unwrap(), 0);

        let board = engine.leaderboard().unwrap();
        let ranks: Vec<_> = board.iter().map(|p| p.rank).collect();
        assert_eq!(ranks, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_seed_reranks_existing_store() {
        let store = Arc::new(InMemoryParkStore::new());
        let engine = RankingEngine::new(store.clone(), RatingConfig::default()).unwrap();
        engine.create_park(new_park("Arches")).unwrap();
        let zion = engine.create_park(new_park("Zion")).unwrap();
        assert_eq!(zion.rank, Some(2));

        // Rating written straight to the store, ranks now stale
        store
            .save_parks(&[Park {
                rating: 1650,
                ..zion.clone()
            }])
            .unwrap();
        assert_eq!(engine.park(zion.id).unwrap().rank, Some(2));

        assert_eq!(engine.seed(&[new_park("Olympic")]).unwrap(), 0);
        assert_eq!(engine.park(zion.id).unwrap().rank, Some(1));
        assert_eq!(engine.parks().unwrap().len(), 2);
    }

    #[test]
    fn test_latest_result_reports_roles() {
        let engine = engine();
        assert!(engine.latest_result().unwrap().is_none());

        let a = engine.create_park(new_park("Arches")).unwrap();
        let b = engine.create_park(new_park("Bryce Canyon")).unwrap();
        let matchup = engine.create_random_matchup().unwrap();
        engine
            .submit_vote(Vote {
                matchup_id: matchup.id,
                winner_id: b.id,
            })
            .unwrap();

        let latest = engine.latest_result().unwrap().unwrap();
        assert_eq!(latest.id, matchup.id);
        assert_eq!(latest.winner.id, b.id);
        assert_eq!(latest.loser.id, a.id);
        assert_eq!(latest.winner_old_rating, 1500);
        assert_eq!(latest.winner_new_rating, 1516);
        assert_eq!(latest.loser_new_rating, 1484);
        assert_eq!(latest.winner.rank, Some(1));
    }
}
