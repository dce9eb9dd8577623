//! UBet — sports betting backend.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! prepares the database (schema + seeds), and serves the HTTP API with
//! graceful shutdown.

use anyhow::Result;
use tracing::info;

use ubet::api::{self, AppState};
use ubet::config::AppConfig;
use ubet::db;

const BANNER: &str = r#"
 _   _ ____       _
| | | | __ )  ___| |_
| | | |  _ \ / _ \ __|
| |_| | |_) |  __/ |_
 \___/|____/ \___|\__|

  Sports Betting Backend
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");
    info!(
        port = cfg.server.port,
        database = %cfg.database.url,
        "UBet backend starting up"
    );

    // -- Database ---------------------------------------------------------

    let pool = db::connect(&cfg.database.url).await?;
    db::init_schema(&pool).await?;
    db::seed(&pool, &cfg).await?;

    if cfg.admin_token().is_none() {
        tracing::warn!(
            env = %cfg.auth.admin_token_env,
            "No static admin token configured; only admin-role sessions get admin access"
        );
    }

    // -- HTTP server ------------------------------------------------------

    let port = cfg.server.port;
    let state = AppState::new(pool, cfg);
    let app = api::build_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(port, "Listening on http://localhost:{port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("UBet backend shut down cleanly.");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received.");
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ubet=info,ubet_backend=info"));

    let json_logging = std::env::var("UBET_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
