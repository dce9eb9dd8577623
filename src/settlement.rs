//! Bet settlement — the grading pass run when a match is finalised.
//!
//! Given a finished match's final score, grade every pending bet on it:
//! winners are credited `odds::payout` against their odds snapshot, losers
//! are marked lost, and a tied final score voids the market (each stake
//! refunded). Each bet is graded inside its own database transaction so a
//! crash mid-pass leaves already-graded bets consistent and the rest
//! pending; re-running settlement picks up where it stopped.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db;
use crate::odds;
use crate::types::{ApiError, Bet, BetStatus, LedgerKind, MatchStatus, Selection};

/// Outcome summary returned to the finalising admin.
#[derive(Debug, Clone, Serialize)]
pub struct SettlementReport {
    pub match_id: i64,
    pub winner: Option<Selection>,
    pub settled: usize,
    pub won: usize,
    pub lost: usize,
    pub voided: usize,
    pub total_paid_out: i64,
}

/// Grade all pending bets on a finished match.
///
/// Errors unless the match exists, is `finished`, and carries both final
/// scores. Idempotent: only pending bets are touched.
pub async fn settle_match(pool: &SqlitePool, match_id: i64) -> Result<SettlementReport, ApiError> {
    let m = db::fetch_match(pool, match_id)
        .await?
        .ok_or(ApiError::NotFound("match"))?;

    if m.status != MatchStatus::Finished {
        return Err(ApiError::MatchNotFinished);
    }
    let (home_score, away_score) = match (m.home_score, m.away_score) {
        (Some(h), Some(a)) => (h, a),
        _ => return Err(ApiError::MatchNotFinished),
    };

    // A tied final score is a push: no winning side, all stakes refunded.
    let winner = if home_score > away_score {
        Some(Selection::Home)
    } else if away_score > home_score {
        Some(Selection::Away)
    } else {
        None
    };

    let pending: Vec<Bet> =
        sqlx::query_as("SELECT * FROM bets WHERE match_id = ?1 AND status = 'pending'")
            .bind(match_id)
            .fetch_all(pool)
            .await?;

    let mut report = SettlementReport {
        match_id,
        winner,
        settled: pending.len(),
        won: 0,
        lost: 0,
        voided: 0,
        total_paid_out: 0,
    };

    for bet in &pending {
        let (status, credit) = grade(bet, winner);

        let mut tx = pool.begin().await?;

        sqlx::query("UPDATE bets SET status = ?1 WHERE id = ?2")
            .bind(status)
            .bind(bet.id)
            .execute(&mut *tx)
            .await?;

        if credit > 0 {
            sqlx::query("UPDATE users SET balance = balance + ?1 WHERE id = ?2")
                .bind(credit)
                .bind(bet.user_id)
                .execute(&mut *tx)
                .await?;

            sqlx::query(
                "INSERT INTO ledger (user_id, kind, amount, created_at) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(bet.user_id)
            .bind(LedgerKind::Payout)
            .bind(credit)
            .bind(chrono::Utc::now())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        match status {
            BetStatus::Won => report.won += 1,
            BetStatus::Lost => report.lost += 1,
            BetStatus::Void => report.voided += 1,
            BetStatus::Pending => {
                warn!(bet_id = bet.id, "bet left pending after grading");
            }
        }
        report.total_paid_out += credit;
    }

    info!(
        match_id,
        winner = ?winner,
        settled = report.settled,
        won = report.won,
        lost = report.lost,
        voided = report.voided,
        paid_out = report.total_paid_out,
        "Match settled"
    );

    Ok(report)
}

/// Grade a single bet: resulting status and the amount to credit back.
fn grade(bet: &Bet, winner: Option<Selection>) -> (BetStatus, i64) {
    match winner {
        None => (BetStatus::Void, bet.wager),
        Some(side) if bet.selection == side => {
            (BetStatus::Won, odds::payout(bet.wager, bet.odds_at_bet))
        }
        Some(_) => (BetStatus::Lost, 0),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
