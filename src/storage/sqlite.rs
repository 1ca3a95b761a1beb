//! SQLite park store
//!
//! Every multi-row write runs inside an immediate transaction, so a vote's
//! park updates and the matchup resolution commit or roll back together, as
//! do a new park and the ranks it shifts.
//! Resolution is a check-and-set on `winner_id IS NULL`.

use crate::error::{RankingError, Result};
use crate::rating::assign_ranks;
use crate::storage::ParkStore;
use crate::types::{Matchup, MatchupId, MatchupOutcome, NewPark, Park, ParkIconType, ParkId};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS parks (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT    NOT NULL UNIQUE,
    description TEXT    NOT NULL DEFAULT '',
    icon_type   TEXT    NOT NULL,
    image_url   TEXT,
    rating      INTEGER NOT NULL DEFAULT 1500,
    rank        INTEGER,
    trending    INTEGER NOT NULL DEFAULT 0,
    last_change INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS matchups (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    park1_id         INTEGER NOT NULL REFERENCES parks(id),
    park2_id         INTEGER NOT NULL REFERENCES parks(id),
    winner_id        INTEGER REFERENCES parks(id),
    park1_old_rating INTEGER,
    park2_old_rating INTEGER,
    park1_new_rating INTEGER,
    park2_new_rating INTEGER,
    created_at       TEXT    NOT NULL,
    resolved_at      TEXT,
    resolved_seq     INTEGER,
    CHECK (park1_id <> park2_id)
);

CREATE INDEX IF NOT EXISTS idx_matchups_resolved_seq ON matchups(resolved_seq);
";

const PARK_COLUMNS: &str =
    "id, name, description, icon_type, image_url, rating, rank, trending, last_change";

const MATCHUP_COLUMNS: &str = "id, park1_id, park2_id, winner_id, park1_old_rating, \
     park2_old_rating, park1_new_rating, park2_new_rating, created_at, resolved_at";

fn unavailable(err: rusqlite::Error) -> anyhow::Error {
    RankingError::StorageUnavailable {
        message: err.to_string(),
    }
    .into()
}

fn park_from_row(row: &Row<'_>) -> rusqlite::Result<Park> {
    let icon: String = row.get(3)?;
    let icon_type = icon
        .parse::<ParkIconType>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    Ok(Park {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        icon_type,
        image_url: row.get(4)?,
        rating: row.get(5)?,
        rank: row.get(6)?,
        trending: row.get(7)?,
        last_change: row.get(8)?,
    })
}

fn matchup_from_row(row: &Row<'_>) -> rusqlite::Result<Matchup> {
    Ok(Matchup {
        id: row.get(0)?,
        park1_id: row.get(1)?,
        park2_id: row.get(2)?,
        winner_id: row.get(3)?,
        park1_old_rating: row.get(4)?,
        park2_old_rating: row.get(5)?,
        park1_new_rating: row.get(6)?,
        park2_new_rating: row.get(7)?,
        created_at: row.get(8)?,
        resolved_at: row.get(9)?,
    })
}

fn update_park(conn: &Connection, park: &Park) -> Result<()> {
    let changed = conn
        .execute(
            "UPDATE parks SET name = ?1, description = ?2, icon_type = ?3, image_url = ?4,
                 rating = ?5, rank = ?6, trending = ?7, last_change = ?8
             WHERE id = ?9",
            params![
                park.name,
                park.description,
                park.icon_type.as_str(),
                park.image_url,
                park.rating,
                park.rank,
                park.trending,
                park.last_change,
                park.id,
            ],
        )
        .map_err(unavailable)?;

    if changed == 0 {
        return Err(RankingError::ParkNotFound { park_id: park.id }.into());
    }
    Ok(())
}

fn select_parks(conn: &Connection) -> Result<Vec<Park>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {} FROM parks ORDER BY id", PARK_COLUMNS))
        .map_err(unavailable)?;

    let parks = stmt
        .query_map([], park_from_row)
        .map_err(unavailable)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(unavailable)?;

    Ok(parks)
}

/// Reassign every rank inside the caller's transaction, writing only rows
/// whose rank moved. Returns all parks in leaderboard order.
fn rerank(conn: &Connection) -> Result<Vec<Park>> {
    let mut parks = select_parks(conn)?;
    let previous: HashMap<ParkId, Option<u32>> =
        parks.iter().map(|park| (park.id, park.rank)).collect();

    assign_ranks(&mut parks);

    for park in &parks {
        if previous.get(&park.id) != Some(&park.rank) {
            conn.execute(
                "UPDATE parks SET rank = ?1 WHERE id = ?2",
                params![park.rank, park.id],
            )
            .map_err(unavailable)?;
        }
    }

    Ok(parks)
}

fn select_matchup(conn: &Connection, matchup_id: MatchupId) -> Result<Option<Matchup>> {
    conn.query_row(
        &format!("SELECT {} FROM matchups WHERE id = ?1", MATCHUP_COLUMNS),
        params![matchup_id],
        matchup_from_row,
    )
    .optional()
    .map_err(unavailable)
}

/// SQLite-backed park store
#[derive(Debug)]
pub struct SqliteParkStore {
    conn: Mutex<Connection>,
}

impl SqliteParkStore {
    /// Open (or create) a database file and make sure the tables exist
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self> {
        info!("Opening SQLite park store at {}", path.display());
        let conn = Connection::open(path).map_err(unavailable)?;
        conn.busy_timeout(busy_timeout).map_err(unavailable)?;
        Self::from_connection(conn)
    }

    /// Private in-memory database, mainly for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(unavailable)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(unavailable)?;
        conn.execute_batch(SCHEMA).map_err(unavailable)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| {
            RankingError::InternalError {
                message: "Failed to acquire SQLite connection lock".to_string(),
            }
            .into()
        })
    }
}

impl ParkStore for SqliteParkStore {
    fn parks(&self) -> Result<Vec<Park>> {
        let conn = self.lock()?;
        select_parks(&conn)
    }

    fn park(&self, park_id: ParkId) -> Result<Option<Park>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {} FROM parks WHERE id = ?1", PARK_COLUMNS),
            params![park_id],
            park_from_row,
        )
        .optional()
        .map_err(unavailable)
    }

    fn park_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM parks", [], |row| row.get(0))
            .map_err(unavailable)?;
        Ok(count as usize)
    }

    fn insert_park(&self, park: NewPark, rating: i64) -> Result<Park> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(unavailable)?;

        let inserted = tx.execute(
            "INSERT INTO parks (name, description, icon_type, image_url, rating)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                park.name,
                park.description,
                park.icon_type.as_str(),
                park.image_url,
                rating,
            ],
        );

        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                return Err(RankingError::InvalidPark {
                    reason: format!("a park named '{}' already exists", park.name),
                }
                .into());
            }
            Err(err) => return Err(unavailable(err)),
        }

        let id = tx.last_insert_rowid();
        let ranked = rerank(&tx)?;
        let created = ranked
            .into_iter()
            .find(|park| park.id == id)
            .ok_or(RankingError::ParkNotFound { park_id: id })?;

        tx.commit().map_err(unavailable)?;
        debug!("Inserted park {} with id {}", created.name, id);

        Ok(created)
    }

    fn save_parks(&self, parks: &[Park]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(unavailable)?;

        for park in parks {
            update_park(&tx, park)?;
        }

        tx.commit().map_err(unavailable)
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

        let conn = self.lock()?;

        for park_id in [park1_id, park2_id] {
            let exists = conn
                .query_row("SELECT 1 FROM parks WHERE id = ?1", params![park_id], |_| {
                    Ok(())
                })
                .optional()
                .map_err(unavailable)?;
            if exists.is_none() {
                return Err(RankingError::ParkNotFound { park_id }.into());
            }
        }

        conn.execute(
            "INSERT INTO matchups (park1_id, park2_id, created_at) VALUES (?1, ?2, ?3)",
            params![park1_id, park2_id, created_at],
        )
        .map_err(unavailable)?;

        Ok(Matchup {
            id: conn.last_insert_rowid(),
            park1_id,
            park2_id,
            winner_id: None,
            park1_old_rating: None,
            park2_old_rating: None,
            park1_new_rating: None,
            park2_new_rating: None,
            created_at,
            resolved_at: None,
        })
    }

    fn matchup(&self, matchup_id: MatchupId) -> Result<Option<Matchup>> {
        let conn = self.lock()?;
        select_matchup(&conn, matchup_id)
    }

    fn resolve_matchup(&self, outcome: &MatchupOutcome, parks: &[Park]) -> Result<Matchup> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(unavailable)?;

        let changed = tx
            .execute(
                "UPDATE matchups
                 SET winner_id = ?1, park1_old_rating = ?2, park2_old_rating = ?3,
                     park1_new_rating = ?4, park2_new_rating = ?5, resolved_at = ?6,
                     resolved_seq = (SELECT COALESCE(MAX(resolved_seq), 0) + 1 FROM matchups)
                 WHERE id = ?7 AND winner_id IS NULL",
                params![
                    outcome.winner_id,
                    outcome.park1_old_rating,
                    outcome.park2_old_rating,
                    outcome.park1_new_rating,
                    outcome.park2_new_rating,
                    outcome.resolved_at,
                    outcome.matchup_id,
                ],
            )
            .map_err(unavailable)?;

        if changed == 0 {
            // Dropping the transaction rolls it back
            return match select_matchup(&tx, outcome.matchup_id)? {
                Some(_) => Err(RankingError::AlreadyResolved {
                    matchup_id: outcome.matchup_id,
                }
                .into()),
                None => Err(RankingError::MatchupNotFound {
                    matchup_id: outcome.matchup_id,
                }
                .into()),
            };
        }

        for park in parks {
            update_park(&tx, park)?;
        }

        let resolved = select_matchup(&tx, outcome.matchup_id)?.ok_or(
            RankingError::MatchupNotFound {
                matchup_id: outcome.matchup_id,
            },
        )?;

        tx.commit().map_err(unavailable)?;
        Ok(resolved)
    }

    fn latest_resolved_matchup(&self) -> Result<Option<Matchup>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM matchups WHERE winner_id IS NOT NULL
                 ORDER BY resolved_seq DESC LIMIT 1",
                MATCHUP_COLUMNS
            ),
            [],
            matchup_from_row,
        )
        .optional()
        .map_err(unavailable)
    }
}
