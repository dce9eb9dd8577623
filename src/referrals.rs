//! Referral bookkeeping: deposit crediting, referral qualification, and
//! milestone rewards.
//!
//! A pending referral qualifies on the referred user's first deposit at or
//! above the configured threshold. Qualification rewards the inviter with
//! contest credits and may open milestone reviews; milestones pay cash only
//! after an admin approves them. The whole deposit path runs in one
//! transaction so a crash can't credit a balance without its ledger entry.

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::config::ReferralsConfig;
use crate::types::{ApiError, LedgerKind, Milestone, MilestoneStatus, Referral};

/// What a deposit did, for the caller's response body.
#[derive(Debug, Clone, Serialize)]
pub struct DepositOutcome {
    pub user_id: i64,
    pub credited: i64,
    pub referral_qualified: bool,
    /// Tiers for which a new pending milestone was opened.
    pub milestones_opened: Vec<i64>,
}

/// Credit a deposit to a user and run referral qualification.
///
/// `amount_cents` converts to whole dollars, rounded half-up, matching the
/// payment processor's cent-denominated totals against the dollar ledger.
pub async fn record_deposit(
    pool: &SqlitePool,
    cfg: &ReferralsConfig,
    user_id: i64,
    amount_cents: i64,
) -> Result<DepositOutcome, ApiError> {
    if amount_cents <= 0 {
        return Err(ApiError::BadRequest("amount_cents must be positive".into()));
    }
    let credited = (amount_cents + 50) / 100;

    let mut tx = pool.begin().await?;

    let updated = sqlx::query("UPDATE users SET balance = balance + ?1 WHERE id = ?2")
        .bind(credited)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    if updated.rows_affected() == 0 {
        return Err(ApiError::NotFound("user"));
    }

    sqlx::query("INSERT INTO ledger (user_id, kind, amount, created_at) VALUES (?1, ?2, ?3, ?4)")
        .bind(user_id)
        .bind(LedgerKind::Deposit)
        .bind(credited)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

    let mut outcome = DepositOutcome {
        user_id,
        credited,
        referral_qualified: false,
        milestones_opened: Vec::new(),
    };

    if amount_cents >= cfg.qualifying_deposit_cents {
        let pending: Option<Referral> = sqlx::query_as(
            "SELECT * FROM referrals WHERE referred_user_id = ?1 AND qualified = 0 LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(referral) = pending {
            sqlx::query(
                "UPDATE referrals SET qualified = 1, qualified_at = ?1, first_deposit_cents = ?2
                 WHERE id = ?3",
            )
            .bind(Utc::now())
            .bind(amount_cents)
            .bind(referral.id)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "UPDATE users SET contest_credits = contest_credits + ?1,
                                  referrals_count = referrals_count + 1
                 WHERE id = ?2",
            )
            .bind(cfg.credits_per_referral)
            .bind(referral.inviter_user_id)
            .execute(&mut *tx)
            .await?;

            let (count,): (i64,) =
                sqlx::query_as("SELECT referrals_count FROM users WHERE id = ?1")
                    .bind(referral.inviter_user_id)
                    .fetch_one(&mut *tx)
                    .await?;

            for tier in &cfg.milestones {
                if count < tier.count {
                    continue;
                }
                let exists: Option<(i64,)> = sqlx::query_as(
                    "SELECT id FROM milestones WHERE user_id = ?1 AND tier = ?2",
                )
                .bind(referral.inviter_user_id)
                .bind(tier.count)
                .fetch_optional(&mut *tx)
                .await?;
                if exists.is_some() {
                    continue;
                }
                if tier.first_only {
                    // First-to-the-post tier: once anyone has it approved,
                    // nobody else gets a shot.
                    let won: Option<(i64,)> = sqlx::query_as(
                        "SELECT id FROM milestones WHERE tier = ?1 AND status = 'approved' LIMIT 1",
                    )
                    .bind(tier.count)
                    .fetch_optional(&mut *tx)
                    .await?;
                    if won.is_some() {
                        continue;
                    }
                }
                sqlx::query(
                    "INSERT INTO milestones (user_id, tier, amount_cents, status, created_at)
                     VALUES (?1, ?2, ?3, 'pending', ?4)",
                )
                .bind(referral.inviter_user_id)
                .bind(tier.count)
                .bind(tier.amount_cents)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;
                outcome.milestones_opened.push(tier.count);
            }

            outcome.referral_qualified = true;
            info!(
                inviter = referral.inviter_user_id,
                referred = user_id,
                deposit_cents = amount_cents,
                "Referral qualified"
            );
        }
    }

    tx.commit().await?;

    info!(user_id, credited, "Deposit recorded");
    Ok(outcome)
}

/// Approve a pending milestone: credit the reward and close the review.
pub async fn approve_milestone(pool: &SqlitePool, id: i64) -> Result<Milestone, ApiError> {
    let milestone = pending_milestone(pool, id).await?;
    let reward = milestone.amount_cents / 100;

    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE users SET balance = balance + ?1 WHERE id = ?2")
        .bind(reward)
        .bind(milestone.user_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("INSERT INTO ledger (user_id, kind, amount, created_at) VALUES (?1, ?2, ?3, ?4)")
        .bind(milestone.user_id)
        .bind(LedgerKind::Milestone)
        .bind(reward)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE milestones SET status = 'approved', decided_at = ?1 WHERE id = ?2")
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(milestone_id = id, user_id = milestone.user_id, reward, "Milestone approved");
    fetch_milestone(pool, id).await
}

/// Deny a pending milestone. No balance movement.
pub async fn deny_milestone(pool: &SqlitePool, id: i64) -> Result<Milestone, ApiError> {
    let milestone = pending_milestone(pool, id).await?;

    sqlx::query("UPDATE milestones SET status = 'denied', decided_at = ?1 WHERE id = ?2")
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

    info!(milestone_id = id, user_id = milestone.user_id, "Milestone denied");
    fetch_milestone(pool, id).await
}

async fn fetch_milestone(pool: &SqlitePool, id: i64) -> Result<Milestone, ApiError> {
    sqlx::query_as("SELECT * FROM milestones WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(ApiError::NotFound("milestone"))
}

async fn pending_milestone(pool: &SqlitePool, id: i64) -> Result<Milestone, ApiError> {
    let m = fetch_milestone(pool, id).await?;
    if m.status != MilestoneStatus::Pending {
        return Err(ApiError::BadRequest(format!(
            "milestone already {}",
            m.status
        )));
    }
    Ok(m)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
