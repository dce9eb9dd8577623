//! Team-logo and player-headshot proxy against the ESPN CDN.
//!
//! Misses (and a disabled proxy) redirect to the frontend's placeholder
//! assets so clients always get an image back.

use axum::extract::{Path, Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use tracing::debug;

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    pub league: Option<String>,
    pub abbr: Option<String>,
    pub espn_id: Option<String>,
}

fn espn_team_url(abbr: &str, league: &str) -> String {
    match league {
        "nfl" => format!("https://a.espncdn.com/i/teamlogos/nfl/500/{abbr}.png"),
        _ => format!("https://a.espncdn.com/i/teamlogos/ncaa/500/{abbr}.png"),
    }
}

fn espn_player_url(espn_id: &str, league: &str) -> String {
    match league {
        "nfl" => format!("https://a.espncdn.com/i/headshots/nfl/players/full/{espn_id}.png"),
        _ => format!(
            "https://a.espncdn.com/i/headshots/college-football/players/full/{espn_id}.png"
        ),
    }
}

/// GET /images/team/:key?league=&abbr=
pub async fn team(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(q): Query<ImageQuery>,
) -> Response {
    let league = q.league.unwrap_or_else(|| "nfl".into()).to_lowercase();
    let abbr = q.abbr.unwrap_or(key).to_lowercase();
    let fallback = placeholder(&state, &state.config.images.placeholder_team);

    if !state.config.images.enabled {
        return fallback;
    }
    proxy(&state, &espn_team_url(&abbr, &league), fallback).await
}

/// GET /images/player/:key?league=&espn_id=
pub async fn player(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(q): Query<ImageQuery>,
) -> Response {
    let league = q.league.unwrap_or_else(|| "nfl".into()).to_lowercase();
    let espn_id = q.espn_id.unwrap_or(key);
    let fallback = placeholder(&state, &state.config.images.placeholder_player);

    if !state.config.images.enabled {
        return fallback;
    }
    proxy(&state, &espn_player_url(&espn_id, &league), fallback).await
}

fn placeholder(state: &AppState, path: &str) -> Response {
    let url = format!("{}{}", state.config.server.frontend_url, path);
    Redirect::temporary(&url).into_response()
}

/// Fetch the upstream asset and relay it; any failure falls back.
async fn proxy(state: &AppState, url: &str, fallback: Response) -> Response {
    let resp = match state.http.get(url).send().await {
        Ok(r) if r.status().is_success() => r,
        Ok(r) => {
            debug!(url, status = %r.status(), "Image upstream miss");
            return fallback;
        }
        Err(e) => {
            debug!(url, error = %e, "Image upstream error");
            return fallback;
        }
    };

    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("image/png")
        .to_string();

    match resp.bytes().await {
        Ok(bytes) => (
            [
                (CONTENT_TYPE, content_type),
                (CACHE_CONTROL, "public, max-age=86400".to_string()),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            debug!(url, error = %e, "Image body read failed");
            fallback
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
