//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (the operational admin token) are referenced by env-var name in
//! the config and resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub referrals: ReferralsConfig,
    pub images: ImagesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Base URL of the frontend, used for image placeholder redirects.
    pub frontend_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Env var holding the static operational admin token.
    pub admin_token_env: String,
    pub session_ttl_hours: i64,
    /// Seeded admin account.
    pub admin_email: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReferralsConfig {
    /// Minimum deposit that qualifies a pending referral ($10 default).
    pub qualifying_deposit_cents: i64,
    /// Contest credits awarded to the inviter per qualified referral.
    pub credits_per_referral: i64,
    /// Referral-count milestone tiers and their cash rewards.
    pub milestones: Vec<MilestoneTier>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MilestoneTier {
    pub count: i64,
    pub amount_cents: i64,
    /// Tier that only the first inviter to reach it can win.
    #[serde(default)]
    pub first_only: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImagesConfig {
    pub enabled: bool,
    pub placeholder_team: String,
    pub placeholder_player: String,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Resolve the operational admin token from the configured env var.
    /// Absent var means the static token path is disabled.
    pub fn admin_token(&self) -> Option<SecretString> {
        Self::resolve_env(&self.auth.admin_token_env)
            .ok()
            .filter(|t| !t.is_empty())
            .map(SecretString::new)
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// Defaults used by unit and integration tests (no file I/O).
    pub fn for_tests() -> Self {
        AppConfig {
            server: ServerConfig {
                port: 0,
                frontend_url: "http://localhost:8888".into(),
            },
            database: DatabaseConfig { url: "sqlite::memory:".into() },
            auth: AuthConfig {
                admin_token_env: "UBET_ADMIN_TOKEN".into(),
                session_ttl_hours: 24 * 7,
                admin_email: "admin@example.com".into(),
            },
            referrals: ReferralsConfig {
                qualifying_deposit_cents: 1000,
                credits_per_referral: 5,
                milestones: vec![
                    MilestoneTier { count: 100, amount_cents: 2_000, first_only: false },
                    MilestoneTier { count: 500, amount_cents: 10_000, first_only: false },
                    MilestoneTier { count: 1000, amount_cents: 100_000, first_only: true },
                ],
            },
            images: ImagesConfig {
                enabled: false,
                placeholder_team: "/assets/default-team.svg".into(),
                placeholder_player: "/assets/default-player.svg".into(),
            },
        }
    }
}
