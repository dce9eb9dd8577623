//! Registration, login, and the request guards.
//!
//! Sessions are opaque uuid tokens held in the `sessions` table with a
//! configurable TTL. Passwords are stored as salted SHA-256 digests.
//! Admin access is either an admin-role session or the static operational
//! token from config.

use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::db;
use crate::types::{ApiError, Role, User};

use super::AppState;

// ---------------------------------------------------------------------------
// Password digests
// ---------------------------------------------------------------------------

pub fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Mint a session token for a user.
pub async fn create_session(
    pool: &SqlitePool,
    user_id: i64,
    ttl_hours: i64,
) -> Result<String, sqlx::Error> {
    let token = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES (?1, ?2, ?3)")
        .bind(&token)
        .bind(user_id)
        .bind(Utc::now() + Duration::hours(ttl_hours))
        .execute(pool)
        .await?;
    Ok(token)
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_owned)
}

// ---------------------------------------------------------------------------
// Guards
// ---------------------------------------------------------------------------

/// A logged-in user, resolved from the bearer token.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = bearer_token(parts).ok_or(ApiError::Unauthorized)?;
        let user = session_user(&state.pool, &token)
            .await?
            .ok_or(ApiError::Unauthorized)?;
        Ok(AuthUser(user))
    }
}

/// Admin access: an admin-role session, or the static operational token.
/// Carries the acting user when the session path was used.
pub struct AdminAccess(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for AdminAccess {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = bearer_token(parts).ok_or(ApiError::Unauthorized)?;

        if let Some(static_token) = state.config.admin_token() {
            if token == static_token.expose_secret().as_str() {
                return Ok(AdminAccess(None));
            }
        }

        let user = session_user(&state.pool, &token)
            .await?
            .ok_or(ApiError::Unauthorized)?;
        if !user.is_admin() {
            return Err(ApiError::Forbidden);
        }
        Ok(AdminAccess(Some(user)))
    }
}

async fn session_user(pool: &SqlitePool, token: &str) -> Result<Option<User>, ApiError> {
    let row: Option<(i64, DateTime<Utc>)> =
        sqlx::query_as("SELECT user_id, expires_at FROM sessions WHERE token = ?1")
            .bind(token)
            .fetch_optional(pool)
            .await?;

    let (user_id, expires_at) = match row {
        Some(r) => r,
        None => return Ok(None),
    };
    if expires_at < Utc::now() {
        return Ok(None);
    }
    Ok(db::fetch_user(pool, user_id).await?)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    /// Inviter reference: a user id or email.
    #[serde(rename = "ref")]
    pub referrer: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub email: String,
    pub name: String,
}

impl From<&User> for UserSummary {
    fn from(u: &User) -> Self {
        UserSummary { id: u.id, email: u.email.clone(), name: u.name.clone() }
    }
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    if req.email.is_empty() || !req.email.contains('@') || req.password.is_empty() {
        return Err(ApiError::BadRequest("email and password required".into()));
    }
    let email = req.email.to_lowercase();

    if db::fetch_user_by_email(&state.pool, &email).await?.is_some() {
        return Err(ApiError::BadRequest("email already registered".into()));
    }

    let name = req
        .name
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or(&email).to_string());

    let salt = Uuid::new_v4().to_string();
    let digest = hash_password(&salt, &req.password);

    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO users (email, name, password_salt, password_digest, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING id",
    )
    .bind(&email)
    .bind(&name)
    .bind(&salt)
    .bind(&digest)
    .bind(Role::User)
    .bind(Utc::now())
    .fetch_one(&state.pool)
    .await?;

    // Record a pending referral if the inviter reference resolves. Bad
    // references are ignored rather than failing the registration.
    if let Some(referrer) = req.referrer.filter(|r| !r.is_empty()) {
        let inviter = match referrer.parse::<i64>() {
            Ok(inviter_id) => db::fetch_user(&state.pool, inviter_id).await?,
            Err(_) => db::fetch_user_by_email(&state.pool, &referrer).await?,
        };
        if let Some(inviter) = inviter.filter(|i| i.id != id) {
            sqlx::query(
                "INSERT INTO referrals (inviter_user_id, referred_user_id, invited_at)
                 VALUES (?1, ?2, ?3)",
            )
            .bind(inviter.id)
            .bind(id)
            .bind(Utc::now())
            .execute(&state.pool)
            .await?;
            info!(inviter = inviter.id, referred = id, "Referral recorded");
        }
    }

    let user = db::fetch_user(&state.pool, id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    let token = create_session(&state.pool, id, state.config.auth.session_ttl_hours).await?;

    info!(user_id = id, email = %email, "User registered");
    Ok(Json(SessionResponse { token, user: UserSummary::from(&user) }))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let email = req.email.to_lowercase();

    let creds: Option<(i64, String, String)> =
        sqlx::query_as("SELECT id, password_salt, password_digest FROM users WHERE email = ?1")
            .bind(&email)
            .fetch_optional(&state.pool)
            .await?;

    let (id, salt, digest) = creds.ok_or(ApiError::Unauthorized)?;
    if digest.is_empty() || hash_password(&salt, &req.password) != digest {
        return Err(ApiError::Unauthorized);
    }

    let user = db::fetch_user(&state.pool, id)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    let token = create_session(&state.pool, id, state.config.auth.session_ttl_hours).await?;

    info!(user_id = id, "User logged in");
    Ok(Json(SessionResponse { token, user: UserSummary::from(&user) }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
