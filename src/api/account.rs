//! Account routes: profile, deposits, ledger, and the referral views.

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::referrals::{self, DepositOutcome};
use crate::types::{ApiError, LedgerEntry};

use super::auth::{AdminAccess, AuthUser};
use super::AppState;

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub balance: i64,
    pub credits: i64,
    pub referrals: i64,
}

/// GET /me (auth)
pub async fn me(AuthUser(user): AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        id: user.id,
        email: user.email,
        name: user.name,
        balance: user.balance,
        credits: user.contest_credits,
        referrals: user.referrals_count,
    })
}

// ---------------------------------------------------------------------------
// Deposits & ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    /// Target account; defaults to the acting admin's own account.
    pub user_id: Option<i64>,
    pub amount_cents: i64,
}

/// POST /account/deposit (admin) — credit a deposit and run referral
/// qualification. Stands in for the payment-processor callback.
pub async fn deposit(
    AdminAccess(actor): AdminAccess,
    State(state): State<AppState>,
    Json(req): Json<DepositRequest>,
) -> Result<Json<DepositOutcome>, ApiError> {
    let target = match req.user_id.or(actor.map(|u| u.id)) {
        Some(id) => id,
        None => return Err(ApiError::BadRequest("user_id required".into())),
    };

    let outcome =
        referrals::record_deposit(&state.pool, &state.config.referrals, target, req.amount_cents)
            .await?;
    Ok(Json(outcome))
}

/// GET /account/ledger (auth) — newest first.
pub async fn ledger(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<LedgerEntry>>, ApiError> {
    let rows: Vec<LedgerEntry> =
        sqlx::query_as("SELECT * FROM ledger WHERE user_id = ?1 ORDER BY created_at DESC, id DESC")
            .bind(user.id)
            .fetch_all(&state.pool)
            .await?;
    Ok(Json(rows))
}

// ---------------------------------------------------------------------------
// Referral views
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ReferredUser {
    pub user_id: i64,
    pub email: String,
    pub name: String,
    pub qualified: bool,
    pub invited_at: DateTime<Utc>,
    pub qualified_at: Option<DateTime<Utc>>,
    pub first_deposit_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct ReferralsResponse {
    pub validated: Vec<ReferredUser>,
    pub pending: Vec<ReferredUser>,
    pub stats: ReferralStats,
}

#[derive(Debug, Serialize)]
pub struct ReferralStats {
    pub validated_count: usize,
    pub pending_count: usize,
    pub credits_earned: i64,
}

/// GET /account/referrals (auth)
pub async fn referrals_view(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ReferralsResponse>, ApiError> {
    let rows: Vec<ReferredUser> = sqlx::query_as(
        "SELECT u.id AS user_id, u.email, u.name,
                r.qualified, r.invited_at, r.qualified_at, r.first_deposit_cents
         FROM referrals r
         JOIN users u ON u.id = r.referred_user_id
         WHERE r.inviter_user_id = ?1
         ORDER BY r.invited_at DESC",
    )
    .bind(user.id)
    .fetch_all(&state.pool)
    .await?;

    let (validated, pending): (Vec<_>, Vec<_>) = rows.into_iter().partition(|r| r.qualified);

    let stats = ReferralStats {
        validated_count: validated.len(),
        pending_count: pending.len(),
        credits_earned: user.contest_credits,
    };

    Ok(Json(ReferralsResponse { validated, pending, stats }))
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct LeaderboardEntry {
    pub user: String,
    pub referrals: i64,
    pub credits: i64,
}

/// GET /referrals/leaderboard — global top inviters.
pub async fn leaderboard(
    State(state): State<AppState>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let rows: Vec<LeaderboardEntry> = sqlx::query_as(
        "SELECT COALESCE(NULLIF(name, ''), email) AS user,
                referrals_count AS referrals,
                contest_credits AS credits
         FROM users
         ORDER BY referrals_count DESC, id ASC
         LIMIT 20",
    )
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(rows))
}
