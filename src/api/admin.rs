//! Admin review routes for referral milestones.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::referrals;
use crate::types::{ApiError, Milestone, MilestoneStatus};

use super::auth::AdminAccess;
use super::AppState;

#[derive(Debug, Deserialize)]
pub struct MilestoneFilter {
    pub status: Option<String>,
}

/// GET /admin/milestones?status= (admin)
pub async fn list_milestones(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Query(filter): Query<MilestoneFilter>,
) -> Result<Json<Vec<Milestone>>, ApiError> {
    let rows: Vec<Milestone> = match filter.status {
        Some(s) => {
            let status: MilestoneStatus = s
                .parse()
                .map_err(ApiError::BadRequest)?;
            sqlx::query_as(
                "SELECT * FROM milestones WHERE status = ?1 ORDER BY created_at DESC",
            )
            .bind(status)
            .fetch_all(&state.pool)
            .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM milestones ORDER BY created_at DESC")
                .fetch_all(&state.pool)
                .await?
        }
    };
    Ok(Json(rows))
}

/// POST /admin/milestones/:id/approve (admin)
pub async fn approve_milestone(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Milestone>, ApiError> {
    let m = referrals::approve_milestone(&state.pool, id).await?;
    Ok(Json(m))
}

/// POST /admin/milestones/:id/deny (admin)
pub async fn deny_milestone(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Milestone>, ApiError> {
    let m = referrals::deny_milestone(&state.pool, id).await?;
    Ok(Json(m))
}
