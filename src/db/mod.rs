//! Persistence layer.
//!
//! Owns the SQLite pool, the schema DDL, idempotent seeding, and the row
//! queries shared by multiple route handlers. The schema is created with
//! plain `CREATE TABLE IF NOT EXISTS` at startup; all timestamps are bound
//! from Rust as RFC 3339 so decoding is uniform.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::types::{Match, OddsLine, User};

/// Columns of `users` safe to hand back to callers (excludes credentials).
pub const USER_COLUMNS: &str =
    "id, email, name, role, balance, contest_credits, referrals_count, created_at";

/// Open a connection pool, creating the database file if missing.
pub async fn connect(url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("Invalid database url: {url}"))?
        .create_if_missing(true)
        .foreign_keys(true);

    // A shared in-memory database only exists per-connection; keep the pool
    // at one connection so every handle sees the same schema.
    let max_connections = if url.contains(":memory:") { 1 } else { 5 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to connect to database: {url}"))?;

    debug!(url, "Database pool ready");
    Ok(pool)
}

/// Create all tables. Idempotent. `raw_sql` because the DDL is a
/// multi-statement batch.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::raw_sql(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            email           TEXT NOT NULL UNIQUE,
            name            TEXT NOT NULL,
            password_salt   TEXT NOT NULL,
            password_digest TEXT NOT NULL,
            role            TEXT NOT NULL DEFAULT 'user',
            balance         INTEGER NOT NULL DEFAULT 0,
            contest_credits INTEGER NOT NULL DEFAULT 0,
            referrals_count INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            token      TEXT PRIMARY KEY,
            user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            expires_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS matches (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            home_team  TEXT NOT NULL,
            away_team  TEXT NOT NULL,
            start_time TEXT NOT NULL,
            status     TEXT NOT NULL DEFAULT 'scheduled',
            home_score INTEGER,
            away_score INTEGER
        );

        CREATE TABLE IF NOT EXISTS odds (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            match_id   INTEGER NOT NULL REFERENCES matches(id) ON DELETE CASCADE,
            market     TEXT NOT NULL DEFAULT 'moneyline',
            odds_home  INTEGER NOT NULL,
            odds_away  INTEGER NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(match_id, market)
        );

        CREATE TABLE IF NOT EXISTS bets (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            match_id    INTEGER NOT NULL REFERENCES matches(id) ON DELETE CASCADE,
            wager       INTEGER NOT NULL,
            selection   TEXT NOT NULL,
            odds_at_bet INTEGER NOT NULL,
            status      TEXT NOT NULL DEFAULT 'pending',
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS ledger (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            kind       TEXT NOT NULL,
            amount     INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS referrals (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            inviter_user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            referred_user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            qualified           INTEGER NOT NULL DEFAULT 0,
            invited_at          TEXT NOT NULL,
            qualified_at        TEXT,
            first_deposit_cents INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS milestones (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id      INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            tier         INTEGER NOT NULL,
            amount_cents INTEGER NOT NULL,
            status       TEXT NOT NULL DEFAULT 'pending',
            created_at   TEXT NOT NULL,
            decided_at   TEXT
        );

        CREATE TABLE IF NOT EXISTS contests (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            title      TEXT NOT NULL,
            sport      TEXT NOT NULL,
            entry_fee  INTEGER NOT NULL,
            prize_pool INTEGER NOT NULL,
            status     TEXT NOT NULL DEFAULT 'open'
        );
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create schema")?;

    Ok(())
}

/// Seed the admin account and, on an empty database, sample fixtures and
/// contests. Safe to run on every startup.
pub async fn seed(pool: &SqlitePool, cfg: &AppConfig) -> Result<()> {
    let admin_exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?1")
        .bind(cfg.auth.admin_email.to_lowercase())
        .fetch_optional(pool)
        .await?;

    if admin_exists.is_none() {
        sqlx::query(
            "INSERT INTO users (email, name, password_salt, password_digest, role, balance, created_at)
             VALUES (?1, 'UBet Admin', '', '', 'admin', 1000, ?2)",
        )
        .bind(cfg.auth.admin_email.to_lowercase())
        .bind(Utc::now())
        .execute(pool)
        .await?;
        info!(email = %cfg.auth.admin_email, "Seeded admin account");
    }

    let match_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM matches")
        .fetch_one(pool)
        .await?;

    if match_count.0 == 0 {
        let now = Utc::now();
        let fixtures = [
            ("KC Chiefs", "LV Raiders", now + Duration::hours(24), -135i64, 115i64),
            ("DAL Cowboys", "PHI Eagles", now + Duration::hours(48), -110, -110),
        ];
        for (home, away, start, odds_home, odds_away) in fixtures {
            let id: (i64,) = sqlx::query_as(
                "INSERT INTO matches (home_team, away_team, start_time, status)
                 VALUES (?1, ?2, ?3, 'scheduled') RETURNING id",
            )
            .bind(home)
            .bind(away)
            .bind(start)
            .fetch_one(pool)
            .await?;

            sqlx::query(
                "INSERT INTO odds (match_id, market, odds_home, odds_away, updated_at)
                 VALUES (?1, 'moneyline', ?2, ?3, ?4)",
            )
            .bind(id.0)
            .bind(odds_home)
            .bind(odds_away)
            .bind(now)
            .execute(pool)
            .await?;
        }
        info!(count = fixtures.len(), "Seeded sample matches and odds");
    }

    let contest_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM contests")
        .fetch_one(pool)
        .await?;

    if contest_count.0 == 0 {
        sqlx::query(
            "INSERT INTO contests (title, sport, entry_fee, prize_pool) VALUES
             ('NFL Sunday Contest', 'NFL', 500, 5000),
             ('CFB Saturday Contest', 'CFB', 300, 3000)",
        )
        .execute(pool)
        .await?;
        info!("Seeded sample contests");
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Shared row queries
// ---------------------------------------------------------------------------

pub async fn fetch_user(pool: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn fetch_user_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"))
        .bind(email.to_lowercase())
        .fetch_optional(pool)
        .await
}

pub async fn fetch_match(pool: &SqlitePool, id: i64) -> Result<Option<Match>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM matches WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Most recently updated line for a match/market pair.
pub async fn latest_odds(
    pool: &SqlitePool,
    match_id: i64,
    market: &str,
) -> Result<Option<OddsLine>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM odds WHERE match_id = ?1 AND market = ?2
         ORDER BY updated_at DESC LIMIT 1",
    )
    .bind(match_id)
    .bind(market)
    .fetch_optional(pool)
    .await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = connect("sqlite::memory:").await.unwrap();
    init_schema(&pool).await.unwrap();
    pool
}
