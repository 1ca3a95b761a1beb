//! JSON handlers for the park and matchup endpoints
//!
//! Store access is synchronous, so every handler hops onto the blocking pool
//! before touching the engine.

use crate::api::ApiState;
use crate::error::{ranking_error, RankingError};
use crate::engine::RankingEngine;
use crate::types::{CurrentMatchup, LatestVoteResult, NewPark, Park, ParkId, RankedPark, Vote};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, warn};

/// Error returned by every API handler, rendered as `{"message": ...}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// HTTP status for a domain error
pub fn status_for(err: &RankingError) -> StatusCode {
    match err {
        RankingError::NotEnoughParks { .. }
        | RankingError::MatchupNotFound { .. }
        | RankingError::ParkNotFound { .. } => StatusCode::NOT_FOUND,
        RankingError::InvalidVote { .. } | RankingError::InvalidPark { .. } => {
            StatusCode::BAD_REQUEST
        }
        RankingError::AlreadyResolved { .. } => StatusCode::CONFLICT,
        RankingError::StorageUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        RankingError::ConfigurationError { .. } | RankingError::InternalError { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match ranking_error(&err) {
            Some(domain) => {
                let status = status_for(domain);
                if domain.is_client_error() {
                    debug!("Request rejected: {}", domain);
                } else if status.is_server_error() {
                    error!("Request failed: {:#}", err);
                } else {
                    warn!("Request failed: {}", domain);
                }
                Self::new(status, domain.to_string())
            }
            None => {
                error!("Unexpected error: {:#}", err);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!("Malformed request body: {}", rejection.body_text());
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Run an engine call on the blocking pool
async fn with_engine<T, F>(engine: &RankingEngine, f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&RankingEngine) -> crate::error::Result<T> + Send + 'static,
{
    let engine = engine.clone();
    tokio::task::spawn_blocking(move || f(&engine))
        .await
        .map_err(|e| {
            error!("Blocking task failed: {}", e);
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        })?
        .map_err(ApiError::from)
}

/// Body of a manual rating edit
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RatingRequest {
    pub rating: i64,
}

/// Body returned after a successful vote
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteResponse {
    pub message: String,
    pub rankings: Vec<RankedPark>,
}

/// GET /api/parks
pub async fn list_parks(State(state): State<ApiState>) -> ApiResult<Json<Vec<Park>>> {
    let parks = with_engine(&state.engine, |engine| engine.parks()).await?;
    Ok(Json(parks))
}

/// GET /api/parks/ranked
pub async fn ranked_parks(State(state): State<ApiState>) -> ApiResult<Json<Vec<RankedPark>>> {
    let rankings = with_engine(&state.engine, |engine| engine.leaderboard()).await?;
    Ok(Json(rankings))
}

/// GET /api/parks/{id}
pub async fn get_park(
    State(state): State<ApiState>,
    Path(park_id): Path<ParkId>,
) -> ApiResult<Json<Park>> {
    let park = with_engine(&state.engine, move |engine| engine.park(park_id)).await?;
    Ok(Json(park))
}

/// POST /api/parks
pub async fn create_park(
    State(state): State<ApiState>,
    payload: Result<Json<NewPark>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Park>)> {
    let Json(park) = payload?;
    let park = with_engine(&state.engine, move |engine| engine.create_park(park)).await?;
    Ok((StatusCode::CREATED, Json(park)))
}

/// PUT /api/parks/{id}/rating
pub async fn set_park_rating(
    State(state): State<ApiState>,
    Path(park_id): Path<ParkId>,
    payload: Result<Json<RatingRequest>, JsonRejection>,
) -> ApiResult<Json<Park>> {
    let Json(request) = payload?;
    let park = with_engine(&state.engine, move |engine| {
        engine.set_park_rating(park_id, request.rating)
    })
    .await?;
    Ok(Json(park))
}

/// GET /api/matchups/random
pub async fn random_matchup(State(state): State<ApiState>) -> ApiResult<Json<CurrentMatchup>> {
    let matchup = with_engine(&state.engine, |engine| engine.create_random_matchup()).await?;
    Ok(Json(matchup))
}

/// GET /api/matchups/latest-result
pub async fn latest_result(State(state): State<ApiState>) -> ApiResult<Json<LatestVoteResult>> {
    with_engine(&state.engine, |engine| engine.latest_result())
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "No matchup results yet"))
}

/// POST /api/matchups/vote
pub async fn submit_vote(
    State(state): State<ApiState>,
    payload: Result<Json<Vote>, JsonRejection>,
) -> ApiResult<Json<VoteResponse>> {
    let Json(vote) = payload?;
    let outcome = with_engine(&state.engine, move |engine| engine.submit_vote(vote))
        .await
        .inspect_err(|e| {
            if e.status() == StatusCode::CONFLICT {
                warn!("Duplicate vote for matchup {}", vote.matchup_id);
            }
        })?;

    Ok(Json(VoteResponse {
        message: "Vote recorded successfully".to_string(),
        rankings: outcome.rankings,
    }))
}
