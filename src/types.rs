//! Common types used throughout the ranking service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Unique identifier for parks
pub type ParkId = i64;

/// Unique identifier for matchups
pub type MatchupId = i64;

/// Rating assigned to parks that have never been voted on
pub const DEFAULT_RATING: i64 = 1500;

/// Ratings accepted from park creation and manual edits. Votes are not bounded.
pub const RATING_BOUNDS: RangeInclusive<i64> = 0..=10_000;

/// Kind of landscape a park is known for, used to pick an icon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParkIconType {
    Mountain,
    Canyon,
    Desert,
    Lake,
    Forest,
    Coastal,
    Volcanic,
    Cave,
}

impl ParkIconType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParkIconType::Mountain => "mountain",
            ParkIconType::Canyon => "canyon",
            ParkIconType::Desert => "desert",
            ParkIconType::Lake => "lake",
            ParkIconType::Forest => "forest",
            ParkIconType::Coastal => "coastal",
            ParkIconType::Volcanic => "volcanic",
            ParkIconType::Cave => "cave",
        }
    }
}

impl std::fmt::Display for ParkIconType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ParkIconType {
    type Err = crate::error::RankingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mountain" => Ok(ParkIconType::Mountain),
            "canyon" => Ok(ParkIconType::Canyon),
            "desert" => Ok(ParkIconType::Desert),
            "lake" => Ok(ParkIconType::Lake),
            "forest" => Ok(ParkIconType::Forest),
            "coastal" => Ok(ParkIconType::Coastal),
            "volcanic" => Ok(ParkIconType::Volcanic),
            "cave" => Ok(ParkIconType::Cave),
            other => Err(crate::error::RankingError::InvalidPark {
                reason: format!("unknown icon type '{}'", other),
            }),
        }
    }
}

/// A park being ranked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Park {
    pub id: ParkId,
    pub name: String,
    pub description: String,
    pub icon_type: ParkIconType,
    pub image_url: Option<String>,
    pub rating: i64,
    /// 1-based leaderboard position, `None` until ranks are first assigned
    pub rank: Option<u32>,
    /// Set when the last rating swing exceeded the trending threshold
    pub trending: bool,
    /// Consecutive win (+) or loss (-) streak
    pub last_change: i64,
}

/// Request to create a park
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPark {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub icon_type: ParkIconType,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Starting rating, the configured default when omitted
    #[serde(default)]
    pub rating: Option<i64>,
}

/// A single pairwise comparison, pending until a vote resolves it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Matchup {
    pub id: MatchupId,
    pub park1_id: ParkId,
    pub park2_id: ParkId,
    pub winner_id: Option<ParkId>,
    pub park1_old_rating: Option<i64>,
    pub park2_old_rating: Option<i64>,
    pub park1_new_rating: Option<i64>,
    pub park2_new_rating: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Matchup {
    /// Whether a vote has already been recorded
    pub fn is_resolved(&self) -> bool {
        self.winner_id.is_some()
    }

    /// Whether the park takes part in this matchup
    pub fn involves(&self, park_id: ParkId) -> bool {
        self.park1_id == park_id || self.park2_id == park_id
    }
}

/// Outcome written to a matchup when it is resolved.
///
/// Ratings are addressed by position (park1/park2), not by winner/loser role.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchupOutcome {
    pub matchup_id: MatchupId,
    pub winner_id: ParkId,
    pub park1_old_rating: i64,
    pub park2_old_rating: i64,
    pub park1_new_rating: i64,
    pub park2_new_rating: i64,
    pub resolved_at: DateTime<Utc>,
}

/// Ephemeral vote input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub matchup_id: MatchupId,
    pub winner_id: ParkId,
}

/// Leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedPark {
    pub id: ParkId,
    pub name: String,
    pub description: String,
    pub icon_type: ParkIconType,
    pub image_url: Option<String>,
    pub rating: i64,
    pub rank: Option<u32>,
    pub trending: bool,
    /// Win/loss streak shown next to the rank
    pub rank_change: i64,
}

impl From<Park> for RankedPark {
    fn from(park: Park) -> Self {
        Self {
            id: park.id,
            name: park.name,
            description: park.description,
            icon_type: park.icon_type,
            image_url: park.image_url,
            rating: park.rating,
            rank: park.rank,
            trending: park.trending,
            rank_change: park.last_change,
        }
    }
}

/// A freshly created matchup with both parks attached for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentMatchup {
    pub id: MatchupId,
    pub park1: Park,
    pub park2: Park,
}

/// Before/after ratings of the most recently resolved matchup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestVoteResult {
    pub id: MatchupId,
    pub winner: Park,
    pub loser: Park,
    pub winner_old_rating: i64,
    pub winner_new_rating: i64,
    pub loser_old_rating: i64,
    pub loser_new_rating: i64,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_type_round_trip_through_str() {
        for icon in [
            ParkIconType::Mountain,
            ParkIconType::Canyon,
            ParkIconType::Cave,
        ] {
            assert_eq!(icon.as_str().parse::<ParkIconType>().unwrap(), icon);
        }
        assert!("glacier".parse::<ParkIconType>().is_err());
    }

    #[test]
    fn test_new_park_defaults_from_json() {
        let park: NewPark =
            serde_json::from_str(r#"{"name": "Zion", "iconType": "canyon"}"#).unwrap();

        assert_eq!(park.name, "Zion");
        assert_eq!(park.icon_type, ParkIconType::Canyon);
        assert!(park.description.is_empty());
        assert_eq!(park.rating, None);
    }

    #[test]
    fn test_ranked_park_carries_streak_as_rank_change() {
        let park = Park {
            id: 3,
            name: "Arches".to_string(),
            description: String::new(),
            icon_type: ParkIconType::Desert,
            image_url: None,
            rating: 1516,
            rank: Some(1),
            trending: true,
            last_change: -2,
        };

        let ranked = RankedPark::from(park);
        assert_eq!(ranked.rank_change, -2);

        let json = serde_json::to_value(&ranked).unwrap();
        assert_eq!(json["rankChange"], -2);
        assert_eq!(json["iconType"], "desert");
    }
}
