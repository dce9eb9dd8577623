//! HTTP API — Axum router over the shared pool and config.
//!
//! CORS is wide open for the frontend; auth is enforced per-handler by the
//! `AuthUser` / `AdminAccess` extractors in `auth`.

pub mod account;
pub mod admin;
pub mod auth;
pub mod bets;
pub mod contests;
pub mod images;
pub mod matches;
pub mod odds_routes;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::config::AppConfig;

/// Shared state accessible by all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<AppConfig>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: AppConfig) -> Self {
        AppState {
            pool,
            config: Arc::new(config),
            http: reqwest::Client::new(),
        }
    }
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin("*".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        // Account
        .route("/me", get(account::me))
        .route("/account/deposit", post(account::deposit))
        .route("/account/ledger", get(account::ledger))
        .route("/account/referrals", get(account::referrals_view))
        .route("/referrals/leaderboard", get(account::leaderboard))
        // Matches & odds
        .route("/matches", get(matches::list).post(matches::create))
        .route("/matches/:id", put(matches::update))
        .route("/matches/:id/finish", post(matches::finish))
        .route("/odds/:match_id", get(odds_routes::list).post(odds_routes::upsert))
        // Bets
        .route("/bets", post(bets::place))
        .route("/bets/mine", get(bets::mine))
        // Contests
        .route("/contests", get(contests::list).post(contests::create))
        // Admin review
        .route("/admin/milestones", get(admin::list_milestones))
        .route("/admin/milestones/:id/approve", post(admin::approve_milestone))
        .route("/admin/milestones/:id/deny", post(admin::deny_milestone))
        // Image proxy
        .route("/images/team/:key", get(images::team))
        .route("/images/player/:key", get(images::player))
        .layer(cors)
        .with_state(state)
}

/// GET /
async fn banner() -> &'static str {
    "UBet backend is running"
}

/// GET /health
async fn health() -> axum::http::StatusCode {
    axum::http::StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
