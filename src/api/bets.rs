//! Bet placement and listing.
//!
//! Placement snapshots the latest moneyline so later line moves never change
//! a ticket's terms, and debits the stake, inserts the bet, and writes the
//! ledger entry in a single transaction.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::db;
use crate::types::{ApiError, Bet, LedgerKind, MatchStatus, Selection};

use super::auth::AuthUser;
use super::AppState;

/// Book default when no line has been posted yet.
const FALLBACK_ODDS: i64 = -110;

#[derive(Debug, Deserialize)]
pub struct PlaceBetRequest {
    pub match_id: i64,
    pub selection: Selection,
    pub wager: i64,
}

/// POST /bets (auth)
pub async fn place(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<PlaceBetRequest>,
) -> Result<Json<Bet>, ApiError> {
    if req.wager < 1 {
        return Err(ApiError::BadRequest("wager must be at least $1".into()));
    }

    let m = db::fetch_match(&state.pool, req.match_id)
        .await?
        .ok_or(ApiError::NotFound("match"))?;
    if m.status == MatchStatus::Finished {
        return Err(ApiError::MatchAlreadyFinished);
    }

    if user.balance < req.wager {
        return Err(ApiError::InsufficientBalance {
            needed: req.wager,
            available: user.balance,
        });
    }

    let odds_at_bet = db::latest_odds(&state.pool, req.match_id, "moneyline")
        .await?
        .map(|line| line.for_selection(req.selection))
        .unwrap_or(FALLBACK_ODDS);

    let mut tx = state.pool.begin().await?;

    // Balance re-checked inside the transaction; the read above is only a
    // fast-fail for the common case.
    let debited = sqlx::query(
        "UPDATE users SET balance = balance - ?1 WHERE id = ?2 AND balance >= ?1",
    )
    .bind(req.wager)
    .bind(user.id)
    .execute(&mut *tx)
    .await?;
    if debited.rows_affected() == 0 {
        return Err(ApiError::InsufficientBalance {
            needed: req.wager,
            available: user.balance,
        });
    }

    let (bet_id,): (i64,) = sqlx::query_as(
        "INSERT INTO bets (user_id, match_id, wager, selection, odds_at_bet, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6) RETURNING id",
    )
    .bind(user.id)
    .bind(req.match_id)
    .bind(req.wager)
    .bind(req.selection)
    .bind(odds_at_bet)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO ledger (user_id, kind, amount, created_at) VALUES (?1, ?2, ?3, ?4)")
        .bind(user.id)
        .bind(LedgerKind::Bet)
        .bind(-req.wager)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    let bet: Bet = sqlx::query_as("SELECT * FROM bets WHERE id = ?1")
        .bind(bet_id)
        .fetch_one(&state.pool)
        .await?;

    info!(
        user_id = user.id,
        match_id = req.match_id,
        selection = %req.selection,
        wager = req.wager,
        odds = odds_at_bet,
        "Bet placed"
    );
    Ok(Json(bet))
}

/// GET /bets/mine (auth) — newest first.
pub async fn mine(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Bet>>, ApiError> {
    let rows: Vec<Bet> =
        sqlx::query_as("SELECT * FROM bets WHERE user_id = ?1 ORDER BY created_at DESC")
            .bind(user.id)
            .fetch_all(&state.pool)
            .await?;
    Ok(Json(rows))
}
