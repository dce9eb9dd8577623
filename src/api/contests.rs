//! Contest listing and admin creation.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::types::{ApiError, Contest};

use super::auth::AdminAccess;
use super::AppState;

/// GET /contests
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Contest>>, ApiError> {
    let rows: Vec<Contest> = sqlx::query_as("SELECT * FROM contests ORDER BY id ASC")
        .fetch_all(&state.pool)
        .await?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct CreateContestRequest {
    pub title: String,
    pub sport: String,
    pub entry_fee: i64,
    pub prize_pool: i64,
}

/// POST /contests (admin)
pub async fn create(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Json(req): Json<CreateContestRequest>,
) -> Result<Json<Contest>, ApiError> {
    if req.title.is_empty() || req.sport.is_empty() {
        return Err(ApiError::BadRequest("title and sport required".into()));
    }
    if req.entry_fee < 0 || req.prize_pool < 0 {
        return Err(ApiError::BadRequest("fees must be non-negative".into()));
    }

    let contest: Contest = sqlx::query_as(
        "INSERT INTO contests (title, sport, entry_fee, prize_pool, status)
         VALUES (?1, ?2, ?3, ?4, 'open') RETURNING *",
    )
    .bind(&req.title)
    .bind(&req.sport)
    .bind(req.entry_fee)
    .bind(req.prize_pool)
    .fetch_one(&state.pool)
    .await?;

    info!(contest_id = contest.id, title = %contest.title, "Contest created");
    Ok(Json(contest))
}
