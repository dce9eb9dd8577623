//! Line management: admin upsert and public listing with implied
//! probabilities.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db;
use crate::odds;
use crate::types::{ApiError, OddsLine};

use super::auth::AdminAccess;
use super::AppState;

fn default_market() -> String {
    "moneyline".to_string()
}

#[derive(Debug, Deserialize)]
pub struct UpsertOddsRequest {
    #[serde(default = "default_market")]
    pub market: String,
    pub odds_home: i64,
    pub odds_away: i64,
}

/// POST /odds/:match_id (admin) — insert or refresh the line for a market.
pub async fn upsert(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Path(match_id): Path<i64>,
    Json(req): Json<UpsertOddsRequest>,
) -> Result<Json<OddsLine>, ApiError> {
    if !odds::is_valid_price(req.odds_home) || !odds::is_valid_price(req.odds_away) {
        return Err(ApiError::BadRequest(
            "odds must be American prices (>= +100 or <= -100)".into(),
        ));
    }
    if db::fetch_match(&state.pool, match_id).await?.is_none() {
        return Err(ApiError::NotFound("match"));
    }

    sqlx::query(
        "INSERT INTO odds (match_id, market, odds_home, odds_away, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (match_id, market)
         DO UPDATE SET odds_home = excluded.odds_home,
                       odds_away = excluded.odds_away,
                       updated_at = excluded.updated_at",
    )
    .bind(match_id)
    .bind(&req.market)
    .bind(req.odds_home)
    .bind(req.odds_away)
    .bind(Utc::now())
    .execute(&state.pool)
    .await?;

    let line = db::latest_odds(&state.pool, match_id, &req.market)
        .await?
        .ok_or(ApiError::NotFound("odds"))?;

    info!(
        match_id,
        market = %req.market,
        home = req.odds_home,
        away = req.odds_away,
        "Line updated"
    );
    Ok(Json(line))
}

/// A line plus the vig-inclusive implied probabilities for display.
#[derive(Debug, Serialize)]
pub struct OddsView {
    #[serde(flatten)]
    pub line: OddsLine,
    pub implied_home: f64,
    pub implied_away: f64,
}

/// GET /odds/:match_id — every market on the match, newest first.
pub async fn list(
    State(state): State<AppState>,
    Path(match_id): Path<i64>,
) -> Result<Json<Vec<OddsView>>, ApiError> {
    let rows: Vec<OddsLine> =
        sqlx::query_as("SELECT * FROM odds WHERE match_id = ?1 ORDER BY updated_at DESC")
            .bind(match_id)
            .fetch_all(&state.pool)
            .await?;

    let views = rows
        .into_iter()
        .map(|line| OddsView {
            implied_home: odds::implied_probability(line.odds_home),
            implied_away: odds::implied_probability(line.odds_away),
            line,
        })
        .collect();

    Ok(Json(views))
}
