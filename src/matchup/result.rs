//! Latest vote result for the "last result" display

use crate::error::Result;
use crate::storage::ParkStore;
use crate::types::{LatestVoteResult, Matchup};
use tracing::warn;

/// Describe the most recently resolved matchup from the winner's and loser's
/// point of view.
///
/// Returns `None` when no vote has been recorded yet. Parks are reported with
/// their current state; the ratings come from the matchup's snapshot.
pub fn latest_vote_result(store: &dyn ParkStore) -> Result<Option<LatestVoteResult>> {
    let Some(matchup) = store.latest_resolved_matchup()? else {
        return Ok(None);
    };

    let Some(snapshot) = RoleSnapshot::from_matchup(&matchup) else {
        warn!("Matchup {} is resolved but missing ratings", matchup.id);
        return Ok(None);
    };

    let (Some(winner), Some(loser)) = (
        store.park(snapshot.winner_id)?,
        store.park(snapshot.loser_id)?,
    ) else {
        warn!("Matchup {} references a missing park", matchup.id);
        return Ok(None);
    };

    Ok(Some(LatestVoteResult {
        id: matchup.id,
        winner,
        loser,
        winner_old_rating: snapshot.winner_old_rating,
        winner_new_rating: snapshot.winner_new_rating,
        loser_old_rating: snapshot.loser_old_rating,
        loser_new_rating: snapshot.loser_new_rating,
        created_at: matchup.created_at,
        resolved_at: matchup.resolved_at,
    }))
}

/// Positional matchup ratings rearranged by winner/loser role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RoleSnapshot {
    winner_id: i64,
    loser_id: i64,
    winner_old_rating: i64,
    winner_new_rating: i64,
    loser_old_rating: i64,
    loser_new_rating: i64,
}

impl RoleSnapshot {
    fn from_matchup(matchup: &Matchup) -> Option<Self> {
        let winner_id = matchup.winner_id?;
        let park1 = (
            matchup.park1_id,
            matchup.park1_old_rating?,
            matchup.park1_new_rating?,
        );
        let park2 = (
            matchup.park2_id,
            matchup.park2_old_rating?,
            matchup.park2_new_rating?,
        );

        let (winner, loser) = if winner_id == matchup.park1_id {
            (park1, park2)
        } else {
            (park2, park1)
        };

        Some(Self {
            winner_id: winner.0,
            loser_id: loser.0,
            winner_old_rating: winner.1,
            winner_new_rating: winner.2,
            loser_old_rating: loser.1,
            loser_new_rating: loser.2,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::current_timestamp;

    fn resolved(winner_id: i64) -> Matchup {
        Matchup {
            id: 1,
            park1_id: 10,
            park2_id: 20,
            winner_id: Some(winner_id),
            park1_old_rating: Some(1500),
            park2_old_rating: Some(1600),
            park1_new_rating: Some(1520),
            park2_new_rating: Some(1580),
            created_at: current_timestamp(),
            resolved_at: Some(current_timestamp()),
        }
    }

    #[test]
    fn test_snapshot_when_park2_wins() {
        let mut matchup = resolved(20);
        matchup.park1_new_rating = Some(1488);
        matchup.park2_new_rating = Some(1612);

        let snapshot = RoleSnapshot::from_matchup(&matchup).unwrap();
        assert_eq!(snapshot.winner_id, 20);
        assert_eq!(snapshot.loser_id, 10);
        assert_eq!(snapshot.winner_old_rating, 1600);
        assert_eq!(snapshot.winner_new_rating, 1612);
        assert_eq!(snapshot.loser_old_rating, 1500);
        assert_eq!(snapshot.loser_new_rating, 1488);
    }

    #[test]
    fn test_snapshot_when_park1_wins() {
        let snapshot = RoleSnapshot::from_matchup(&resolved(10)).unwrap();
        assert_eq!(snapshot.winner_id, 10);
        assert_eq!(snapshot.winner_new_rating, 1520);
        assert_eq!(snapshot.loser_new_rating, 1580);
    }

    #[test]
    fn test_snapshot_requires_complete_ratings() {
        let mut matchup = resolved(10);
        matchup.park2_new_rating = None;
        assert!(RoleSnapshot::from_matchup(&matchup).is_none());

        let mut pending = resolved(10);
        pending.winner_id = None;
        assert!(RoleSnapshot::from_matchup(&pending).is_none());
    }
}
