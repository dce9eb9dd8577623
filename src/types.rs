//! Shared types for the UBet backend.
//!
//! These types form the data model used across all modules: database rows,
//! the enums stored as TEXT columns, and the domain error type returned by
//! every route handler.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// An account row. `balance` is whole dollars; `contest_credits` are the
/// referral-reward play credits.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub balance: i64,
    pub contest_credits: i64,
    pub referrals_count: i64,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

// ---------------------------------------------------------------------------
// Matches
// ---------------------------------------------------------------------------

/// A scheduled or played fixture.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Match {
    pub id: i64,
    pub home_team: String,
    pub away_team: String,
    pub start_time: DateTime<Utc>,
    pub status: MatchStatus,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} vs {} ({} @ {})",
            self.home_team, self.away_team, self.status, self.start_time
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MatchStatus {
    Scheduled,
    Live,
    Finished,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStatus::Scheduled => write!(f, "scheduled"),
            MatchStatus::Live => write!(f, "live"),
            MatchStatus::Finished => write!(f, "finished"),
        }
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scheduled" => Ok(MatchStatus::Scheduled),
            "live" => Ok(MatchStatus::Live),
            "finished" => Ok(MatchStatus::Finished),
            other => Err(format!("unknown match status: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Odds
// ---------------------------------------------------------------------------

/// A posted line for a match. Odds are American notation as signed integers
/// (e.g. -135, +115); `market` is "moneyline" unless stated otherwise.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OddsLine {
    pub id: i64,
    pub match_id: i64,
    pub market: String,
    pub odds_home: i64,
    pub odds_away: i64,
    pub updated_at: DateTime<Utc>,
}

impl OddsLine {
    /// The quoted price for one side of the line.
    pub fn for_selection(&self, selection: Selection) -> i64 {
        match selection {
            Selection::Home => self.odds_home,
            Selection::Away => self.odds_away,
        }
    }
}

// ---------------------------------------------------------------------------
// Bets
// ---------------------------------------------------------------------------

/// A wager placed by a user. `odds_at_bet` is the American-odds snapshot
/// taken at placement time; settlement pays out against it, not the current
/// line.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Bet {
    pub id: i64,
    pub user_id: i64,
    pub match_id: i64,
    pub wager: i64,
    pub selection: Selection,
    pub odds_at_bet: i64,
    pub status: BetStatus,
    pub created_at: DateTime<Utc>,
}

/// Which side of a moneyline the bettor took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Selection {
    Home,
    Away,
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Home => write!(f, "home"),
            Selection::Away => write!(f, "away"),
        }
    }
}

impl FromStr for Selection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "home" => Ok(Selection::Home),
            "away" => Ok(Selection::Away),
            other => Err(format!("selection must be home|away, got: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum BetStatus {
    Pending,
    Won,
    Lost,
    Void,
}

impl fmt::Display for BetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetStatus::Pending => write!(f, "pending"),
            BetStatus::Won => write!(f, "won"),
            BetStatus::Lost => write!(f, "lost"),
            BetStatus::Void => write!(f, "void"),
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// One balance movement. Amounts are signed whole dollars: deposits and
/// payouts positive, stakes negative.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LedgerEntry {
    pub id: i64,
    pub user_id: i64,
    pub kind: LedgerKind,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum LedgerKind {
    Deposit,
    Bet,
    Payout,
    Milestone,
}

impl fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerKind::Deposit => write!(f, "deposit"),
            LedgerKind::Bet => write!(f, "bet"),
            LedgerKind::Payout => write!(f, "payout"),
            LedgerKind::Milestone => write!(f, "milestone"),
        }
    }
}

// ---------------------------------------------------------------------------
// Referrals & milestones
// ---------------------------------------------------------------------------

/// An invite link between two accounts. Qualifies on the referred user's
/// first deposit at or above the configured threshold.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Referral {
    pub id: i64,
    pub inviter_user_id: i64,
    pub referred_user_id: i64,
    pub qualified: bool,
    pub invited_at: DateTime<Utc>,
    pub qualified_at: Option<DateTime<Utc>>,
    pub first_deposit_cents: i64,
}

/// A referral-count reward awaiting admin review. `amount_cents` is the cash
/// reward paid on approval.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Milestone {
    pub id: i64,
    pub user_id: i64,
    pub tier: i64,
    pub amount_cents: i64,
    pub status: MilestoneStatus,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MilestoneStatus {
    Pending,
    Approved,
    Denied,
}

impl fmt::Display for MilestoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MilestoneStatus::Pending => write!(f, "pending"),
            MilestoneStatus::Approved => write!(f, "approved"),
            MilestoneStatus::Denied => write!(f, "denied"),
        }
    }
}

impl FromStr for MilestoneStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(MilestoneStatus::Pending),
            "approved" => Ok(MilestoneStatus::Approved),
            "denied" => Ok(MilestoneStatus::Denied),
            other => Err(format!("unknown milestone status: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Contests
// ---------------------------------------------------------------------------

/// A fantasy contest listing. Fees and pools are in cents.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Contest {
    pub id: i64,
    pub title: String,
    pub sport: String,
    pub entry_fee: i64,
    pub prize_pool: i64,
    pub status: String,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Domain errors for the UBet API. Each variant maps to a stable HTTP status;
/// database failures are logged server-side and returned as an opaque 500.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("admin access required")]
    Forbidden,

    #[error("insufficient balance: need ${needed}, have ${available}")]
    InsufficientBalance { needed: i64, available: i64 },

    #[error("match already finished")]
    MatchAlreadyFinished,

    #[error("match not finished")]
    MatchNotFinished,

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_)
            | ApiError::InsufficientBalance { .. }
            | ApiError::MatchAlreadyFinished
            | ApiError::MatchNotFinished => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Database(ref e) = self {
            tracing::error!(error = %e, "database error in request handler");
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
