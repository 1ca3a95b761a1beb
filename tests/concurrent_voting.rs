//! Concurrency tests for vote processing
//!
//! Votes run on the blocking pool the same way the HTTP handlers run them,
//! so these tests exercise the update lock and the store's single-resolution
//! guarantee under real contention.

mod fixtures;

use fixtures::engine_with_parks;
use futures::future::join_all;
use park_ranker::config::RatingConfig;
use park_ranker::error::{ranking_error, RankingError};
use park_ranker::storage::{ParkStore, SqliteParkStore};
use park_ranker::types::Vote;
use park_ranker::RankingEngine;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_votes_on_one_matchup() {
    let (_store, engine) = engine_with_parks(&["Yosemite", "Zion", "Olympic"]);
    let matchup = engine.create_random_matchup().unwrap();
    let before = engine.parks().unwrap();

    let attempts = 32;
    let tasks: Vec<_> = (0..attempts)
        .map(|i| {
            let engine = engine.clone();
            let vote = Vote {
                matchup_id: matchup.id,
                winner_id: if i % 2 == 0 {
                    matchup.park1.id
                } else {
                    matchup.park2.id
                },
            };
            tokio::task::spawn_blocking(move || engine.submit_vote(vote))
        })
        .collect();

    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let accepted = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(accepted, 1, "exactly one vote may resolve a matchup");

    for result in results.iter().filter(|result| result.is_err()) {
        let err = result.as_ref().unwrap_err();
        assert_eq!(
            ranking_error(err),
            Some(&RankingError::AlreadyResolved {
                matchup_id: matchup.id
            })
        );
    }

    // Only one rating update was applied
    let total_before: i64 = before.iter().map(|park| park.rating).sum();
    let after = engine.parks().unwrap();
    let total_after: i64 = after.iter().map(|park| park.rating).sum();
    assert!((total_after - total_before).abs() <= 1);

    let moved = after
        .iter()
        .zip(before.iter())
        .filter(|(new, old)| new.rating != old.rating)
        .count();
    assert_eq!(moved, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_votes_on_different_matchups() {
    let names = [
        "Acadia",
        "Arches",
        "Badlands",
        "Big Bend",
        "Bryce Canyon",
        "Capitol Reef",
        "Denali",
        "Everglades",
    ];
    let (_store, engine) = engine_with_parks(&names);

    let matchups: Vec<_> = (0..100)
        .map(|_| engine.create_random_matchup().unwrap())
        .collect();

    let start = Instant::now();
    let tasks: Vec<_> = matchups
        .iter()
        .enumerate()
        .map(|(i, matchup)| {
            let engine = engine.clone();
            let vote = Vote {
                matchup_id: matchup.id,
                winner_id: if i % 3 == 0 {
                    matchup.park2.id
                } else {
                    matchup.park1.id
                },
            };
            tokio::task::spawn_blocking(move || engine.submit_vote(vote))
        })
        .collect();

    let results = join_all(tasks).await;
    let elapsed = start.elapsed();

    for result in results {
        result.unwrap().unwrap();
    }
    assert!(
        elapsed < Duration::from_secs(10),
        "100 votes took {:?}",
        elapsed
    );

    let board = engine.leaderboard().unwrap();
    let ranks: HashSet<u32> = board.iter().filter_map(|park| park.rank).collect();
    assert_eq!(ranks, (1..=names.len() as u32).collect::<HashSet<_>>());
    for pair in board.windows(2) {
        assert!(pair[0].rating >= pair[1].rating);
        if pair[0].rating == pair[1].rating {
            assert!(pair[0].id < pair[1].id);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_matchup_creation() {
    let (store, engine) = engine_with_parks(&["Yosemite", "Zion", "Olympic", "Glacier"]);

    let tasks: Vec<_> = (0..50)
        .map(|_| {
            let engine = engine.clone();
            tokio::task::spawn_blocking(move || engine.create_random_matchup())
        })
        .collect();

    let ids: HashSet<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap().id)
        .collect();

    assert_eq!(ids.len(), 50);
    for id in ids {
        let matchup = store.matchup(id).unwrap().unwrap();
        assert_ne!(matchup.park1_id, matchup.park2_id);
        assert!(!matchup.is_resolved());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_votes_with_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        SqliteParkStore::open(&dir.path().join("votes.db"), Duration::from_secs(5)).unwrap(),
    );
    let engine = RankingEngine::new(store, RatingConfig::default()).unwrap();
    for name in ["Yosemite", "Zion", "Olympic"] {
        engine.create_park(fixtures::new_park(name)).unwrap();
    }
    let matchup = engine.create_random_matchup().unwrap();

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let engine = engine.clone();
            let vote = Vote {
                matchup_id: matchup.id,
                winner_id: matchup.park1.id,
            };
            tokio::task::spawn_blocking(move || engine.submit_vote(vote))
        })
        .collect();

    let accepted = join_all(tasks)
        .await
        .into_iter()
        .filter(|joined| matches!(joined, Ok(Ok(_))))
        .count();
    assert_eq!(accepted, 1);

    let winner = engine.park(matchup.park1.id).unwrap();
    assert_eq!(winner.rating, 1516);
    assert_eq!(winner.last_change, 1);
}
