//! Fixture routes: listing, admin creation, score updates, and the
//! finalise-and-settle endpoint.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use crate::db;
use crate::settlement::{self, SettlementReport};
use crate::types::{ApiError, Match, MatchStatus};

use super::auth::AdminAccess;
use super::AppState;

/// GET /matches — upcoming first.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Match>>, ApiError> {
    let rows: Vec<Match> =
        sqlx::query_as("SELECT * FROM matches ORDER BY start_time ASC LIMIT 200")
            .fetch_all(&state.pool)
            .await?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct CreateMatchRequest {
    pub home_team: String,
    pub away_team: String,
    pub start_time: DateTime<Utc>,
}

/// POST /matches (admin)
pub async fn create(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Json(req): Json<CreateMatchRequest>,
) -> Result<Json<Match>, ApiError> {
    if req.home_team.is_empty() || req.away_team.is_empty() {
        return Err(ApiError::BadRequest("home_team and away_team required".into()));
    }

    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO matches (home_team, away_team, start_time, status)
         VALUES (?1, ?2, ?3, 'scheduled') RETURNING id",
    )
    .bind(&req.home_team)
    .bind(&req.away_team)
    .bind(req.start_time)
    .fetch_one(&state.pool)
    .await?;

    let m = db::fetch_match(&state.pool, id)
        .await?
        .ok_or(ApiError::NotFound("match"))?;
    info!(match_id = id, fixture = %m, "Match created");
    Ok(Json(m))
}

#[derive(Debug, Deserialize)]
pub struct UpdateMatchRequest {
    pub status: Option<MatchStatus>,
    pub start_time: Option<DateTime<Utc>>,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
}

/// PUT /matches/:id (admin) — partial update of schedule, status, scores.
pub async fn update(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateMatchRequest>,
) -> Result<Json<Match>, ApiError> {
    let mut m = db::fetch_match(&state.pool, id)
        .await?
        .ok_or(ApiError::NotFound("match"))?;

    if let Some(status) = req.status {
        m.status = status;
    }
    if let Some(start_time) = req.start_time {
        m.start_time = start_time;
    }
    if req.home_score.is_some() {
        m.home_score = req.home_score;
    }
    if req.away_score.is_some() {
        m.away_score = req.away_score;
    }

    sqlx::query(
        "UPDATE matches SET status = ?1, start_time = ?2, home_score = ?3, away_score = ?4
         WHERE id = ?5",
    )
    .bind(m.status)
    .bind(m.start_time)
    .bind(m.home_score)
    .bind(m.away_score)
    .bind(id)
    .execute(&state.pool)
    .await?;

    Ok(Json(m))
}

#[derive(Debug, Deserialize)]
pub struct FinishMatchRequest {
    pub home_score: i64,
    pub away_score: i64,
}

/// POST /matches/:id/finish (admin) — record the final score and grade every
/// pending bet on the match.
///
/// Safe to re-run: settlement only touches pending bets, so calling finish
/// again (or after the status was set to finished some other way) grades
/// whatever is still outstanding and credits nothing twice.
pub async fn finish(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<FinishMatchRequest>,
) -> Result<Json<SettlementReport>, ApiError> {
    if req.home_score < 0 || req.away_score < 0 {
        return Err(ApiError::BadRequest("scores must be non-negative".into()));
    }

    db::fetch_match(&state.pool, id)
        .await?
        .ok_or(ApiError::NotFound("match"))?;

    sqlx::query(
        "UPDATE matches SET status = 'finished', home_score = ?1, away_score = ?2 WHERE id = ?3",
    )
    .bind(req.home_score)
    .bind(req.away_score)
    .bind(id)
    .execute(&state.pool)
    .await?;

    let report = settlement::settle_match(&state.pool, id).await?;
    Ok(Json(report))
}
