//! End-to-end API flows against the real router and an in-memory database:
//! register → deposit → bet → finish → payout, plus referral qualification
//! and milestone review.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use ubet::api::{build_router, AppState};
use ubet::config::AppConfig;
use ubet::db;

async fn test_app() -> (Router, sqlx::SqlitePool) {
    let pool = db::connect("sqlite::memory:").await.unwrap();
    db::init_schema(&pool).await.unwrap();
    let mut cfg = AppConfig::for_tests();
    cfg.images.enabled = false;
    db::seed(&pool, &cfg).await.unwrap();
    (build_router(AppState::new(pool.clone(), cfg)), pool)
}

async fn request(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let req = match body {
        Some(b) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1 << 20).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Register a user and return (token, user_id).
async fn register(app: &Router, email: &str, referrer: Option<&str>) -> (String, i64) {
    let mut body = json!({ "email": email, "password": "hunter2" });
    if let Some(r) = referrer {
        body["ref"] = json!(r);
    }
    let (status, resp) = request(app, Method::POST, "/auth/register", None, Some(body)).await;
    assert_eq!(status, StatusCode::OK, "register failed: {resp}");
    (
        resp["token"].as_str().unwrap().to_string(),
        resp["user"]["id"].as_i64().unwrap(),
    )
}

/// Register a user and promote them to admin directly in the store.
async fn register_admin(app: &Router, pool: &sqlx::SqlitePool, email: &str) -> (String, i64) {
    let (token, id) = register(app, email, None).await;
    sqlx::query("UPDATE users SET role = 'admin' WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
    (token, id)
}

#[tokio::test]
async fn register_login_me_flow() {
    let (app, _pool) = test_app().await;
    let (token, id) = register(&app, "alice@example.com", None).await;

    let (status, me) = request(&app, Method::GET, "/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"].as_i64().unwrap(), id);
    assert_eq!(me["email"], "alice@example.com");
    assert_eq!(me["balance"].as_i64().unwrap(), 0);

    // Fresh login works and yields a distinct token.
    let (status, login) = request(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "hunter2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(login["token"], json!(token));

    // Wrong password is rejected.
    let (status, _) = request(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_registration_rejected() {
    let (app, _pool) = test_app().await;
    register(&app, "dup@example.com", None).await;

    let (status, _) = request(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "email": "dup@example.com", "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn full_bet_and_settlement_flow() {
    let (app, pool) = test_app().await;
    let (admin, _) = register_admin(&app, &pool, "ops@example.com").await;
    let (alice, alice_id) = register(&app, "alice@example.com", None).await;

    // Fund Alice with $100.
    let (status, _) = request(
        &app,
        Method::POST,
        "/account/deposit",
        Some(&admin),
        Some(json!({ "user_id": alice_id, "amount_cents": 10_000 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Seeded match 1 carries a -135/+115 moneyline. Alice takes the dog.
    let (status, bet) = request(
        &app,
        Method::POST,
        "/bets",
        Some(&alice),
        Some(json!({ "match_id": 1, "selection": "away", "wager": 20 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "bet failed: {bet}");
    assert_eq!(bet["odds_at_bet"].as_i64().unwrap(), 115);
    assert_eq!(bet["status"], "pending");

    let (_, me) = request(&app, Method::GET, "/me", Some(&alice), None).await;
    assert_eq!(me["balance"].as_i64().unwrap(), 80);

    // Away team wins; settlement pays 20 + floor(20*115/100) = 43.
    let (status, report) = request(
        &app,
        Method::POST,
        "/matches/1/finish",
        Some(&admin),
        Some(json!({ "home_score": 13, "away_score": 27 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["settled"].as_i64().unwrap(), 1);
    assert_eq!(report["won"].as_i64().unwrap(), 1);
    assert_eq!(report["total_paid_out"].as_i64().unwrap(), 43);

    let (_, me) = request(&app, Method::GET, "/me", Some(&alice), None).await;
    assert_eq!(me["balance"].as_i64().unwrap(), 123);

    // Ledger shows deposit, stake, payout.
    let (_, ledger) = request(&app, Method::GET, "/account/ledger", Some(&alice), None).await;
    let kinds: Vec<&str> = ledger
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["kind"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"deposit"));
    assert!(kinds.contains(&"bet"));
    assert!(kinds.contains(&"payout"));

    // Betting on the finished match is rejected.
    let (status, _) = request(
        &app,
        Method::POST,
        "/bets",
        Some(&alice),
        Some(json!({ "match_id": 1, "selection": "home", "wager": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Re-finishing is a no-op: nothing left pending, nothing credited twice.
    let (status, report) = request(
        &app,
        Method::POST,
        "/matches/1/finish",
        Some(&admin),
        Some(json!({ "home_score": 13, "away_score": 27 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["settled"].as_i64().unwrap(), 0);

    let (_, me) = request(&app, Method::GET, "/me", Some(&alice), None).await;
    assert_eq!(me["balance"].as_i64().unwrap(), 123);
}

#[tokio::test]
async fn finish_settles_bets_after_manual_status_update() {
    let (app, pool) = test_app().await;
    let (admin, _) = register_admin(&app, &pool, "ops@example.com").await;
    let (alice, alice_id) = register(&app, "stuck@example.com", None).await;

    request(
        &app,
        Method::POST,
        "/account/deposit",
        Some(&admin),
        Some(json!({ "user_id": alice_id, "amount_cents": 5_000 })),
    )
    .await;
    request(
        &app,
        Method::POST,
        "/bets",
        Some(&alice),
        Some(json!({ "match_id": 1, "selection": "away", "wager": 20 })),
    )
    .await;

    // The match gets flipped to finished through the plain update route,
    // bypassing settlement entirely.
    let (status, _) = request(
        &app,
        Method::PUT,
        "/matches/1",
        Some(&admin),
        Some(json!({ "status": "finished", "home_score": 13, "away_score": 27 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, bets) = request(&app, Method::GET, "/bets/mine", Some(&alice), None).await;
    assert_eq!(bets[0]["status"], "pending");

    // Finish still works and grades the outstanding ticket.
    let (status, report) = request(
        &app,
        Method::POST,
        "/matches/1/finish",
        Some(&admin),
        Some(json!({ "home_score": 13, "away_score": 27 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "finish failed: {report}");
    assert_eq!(report["settled"].as_i64().unwrap(), 1);
    assert_eq!(report["won"].as_i64().unwrap(), 1);
    assert_eq!(report["total_paid_out"].as_i64().unwrap(), 43);

    // $50 deposit - $20 stake + $43 payout.
    let (_, me) = request(&app, Method::GET, "/me", Some(&alice), None).await;
    assert_eq!(me["balance"].as_i64().unwrap(), 73);
}

#[tokio::test]
async fn static_admin_token_grants_admin_access() {
    let pool = db::connect("sqlite::memory:").await.unwrap();
    db::init_schema(&pool).await.unwrap();
    let mut cfg = AppConfig::for_tests();
    cfg.images.enabled = false;
    cfg.auth.admin_token_env = "UBET_TEST_STATIC_ADMIN_TOKEN".into();
    std::env::set_var("UBET_TEST_STATIC_ADMIN_TOKEN", "ops-override-token");
    db::seed(&pool, &cfg).await.unwrap();
    let app = build_router(AppState::new(pool, cfg));

    // The operational token reaches admin routes with no session behind it.
    let (status, list) = request(
        &app,
        Method::GET,
        "/admin/milestones",
        Some("ops-override-token"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "static token rejected: {list}");
    assert!(list.as_array().unwrap().is_empty());

    // A token that matches neither the static token nor a session stays out.
    let (status, _) = request(
        &app,
        Method::GET,
        "/admin/milestones",
        Some("not-the-token"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn insufficient_balance_rejected() {
    let (app, _pool) = test_app().await;
    let (alice, _) = register(&app, "broke@example.com", None).await;

    let (status, body) = request(
        &app,
        Method::POST,
        "/bets",
        Some(&alice),
        Some(json!({ "match_id": 1, "selection": "home", "wager": 50 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("insufficient balance"));
}

#[tokio::test]
async fn tie_voids_bets_and_refunds() {
    let (app, pool) = test_app().await;
    let (admin, _) = register_admin(&app, &pool, "ops@example.com").await;
    let (alice, alice_id) = register(&app, "push@example.com", None).await;

    request(
        &app,
        Method::POST,
        "/account/deposit",
        Some(&admin),
        Some(json!({ "user_id": alice_id, "amount_cents": 5_000 })),
    )
    .await;

    request(
        &app,
        Method::POST,
        "/bets",
        Some(&alice),
        Some(json!({ "match_id": 2, "selection": "home", "wager": 30 })),
    )
    .await;

    let (status, report) = request(
        &app,
        Method::POST,
        "/matches/2/finish",
        Some(&admin),
        Some(json!({ "home_score": 21, "away_score": 21 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["voided"].as_i64().unwrap(), 1);
    assert!(report["winner"].is_null());

    // Stake refunded in full.
    let (_, me) = request(&app, Method::GET, "/me", Some(&alice), None).await;
    assert_eq!(me["balance"].as_i64().unwrap(), 50);

    let (_, bets) = request(&app, Method::GET, "/bets/mine", Some(&alice), None).await;
    assert_eq!(bets[0]["status"], "void");
}

#[tokio::test]
async fn odds_upsert_and_snapshot() {
    let (app, pool) = test_app().await;
    let (admin, _) = register_admin(&app, &pool, "ops@example.com").await;
    let (alice, alice_id) = register(&app, "line@example.com", None).await;

    request(
        &app,
        Method::POST,
        "/account/deposit",
        Some(&admin),
        Some(json!({ "user_id": alice_id, "amount_cents": 10_000 })),
    )
    .await;

    // Move the line on match 2, then bet at the new price.
    let (status, line) = request(
        &app,
        Method::POST,
        "/odds/2",
        Some(&admin),
        Some(json!({ "odds_home": -150, "odds_away": 130 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(line["odds_home"].as_i64().unwrap(), -150);

    let (_, bet) = request(
        &app,
        Method::POST,
        "/bets",
        Some(&alice),
        Some(json!({ "match_id": 2, "selection": "away", "wager": 10 })),
    )
    .await;
    assert_eq!(bet["odds_at_bet"].as_i64().unwrap(), 130);

    // Line moves again; the ticket keeps its snapshot.
    request(
        &app,
        Method::POST,
        "/odds/2",
        Some(&admin),
        Some(json!({ "odds_home": -200, "odds_away": 170 })),
    )
    .await;
    let (_, bets) = request(&app, Method::GET, "/bets/mine", Some(&alice), None).await;
    assert_eq!(bets[0]["odds_at_bet"].as_i64().unwrap(), 130);

    // Only one moneyline row per match after repeated upserts.
    let (_, lines) = request(&app, Method::GET, "/odds/2", None, None).await;
    assert_eq!(lines.as_array().unwrap().len(), 1);
    assert!(lines[0]["implied_home"].as_f64().unwrap() > 0.5);

    // Invalid American prices are rejected.
    let (status, _) = request(
        &app,
        Method::POST,
        "/odds/2",
        Some(&admin),
        Some(json!({ "odds_home": 0, "odds_away": 50 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn referral_qualification_flow() {
    let (app, pool) = test_app().await;
    let (admin, _) = register_admin(&app, &pool, "ops@example.com").await;
    let (inviter, _) = register(&app, "inviter@example.com", None).await;
    let (_, referred_id) = register(&app, "friend@example.com", Some("inviter@example.com")).await;

    // Referral starts pending.
    let (_, view) = request(&app, Method::GET, "/account/referrals", Some(&inviter), None).await;
    assert_eq!(view["stats"]["pending_count"].as_i64().unwrap(), 1);
    assert_eq!(view["stats"]["validated_count"].as_i64().unwrap(), 0);

    // Sub-threshold deposit does not qualify.
    request(
        &app,
        Method::POST,
        "/account/deposit",
        Some(&admin),
        Some(json!({ "user_id": referred_id, "amount_cents": 500 })),
    )
    .await;
    let (_, view) = request(&app, Method::GET, "/account/referrals", Some(&inviter), None).await;
    assert_eq!(view["stats"]["validated_count"].as_i64().unwrap(), 0);

    // $10 deposit qualifies and rewards the inviter.
    let (_, outcome) = request(
        &app,
        Method::POST,
        "/account/deposit",
        Some(&admin),
        Some(json!({ "user_id": referred_id, "amount_cents": 1000 })),
    )
    .await;
    assert_eq!(outcome["referral_qualified"], json!(true));

    let (_, view) = request(&app, Method::GET, "/account/referrals", Some(&inviter), None).await;
    assert_eq!(view["stats"]["validated_count"].as_i64().unwrap(), 1);
    assert_eq!(view["stats"]["credits_earned"].as_i64().unwrap(), 5);
    assert_eq!(view["validated"][0]["email"], "friend@example.com");
    assert_eq!(view["validated"][0]["first_deposit_cents"].as_i64().unwrap(), 1000);

    // Leaderboard surfaces the inviter on top.
    let (_, board) = request(&app, Method::GET, "/referrals/leaderboard", None, None).await;
    assert_eq!(board[0]["referrals"].as_i64().unwrap(), 1);
    assert_eq!(board[0]["credits"].as_i64().unwrap(), 5);
}

#[tokio::test]
async fn milestone_review_flow() {
    let (app, pool) = test_app().await;
    let (admin, _) = register_admin(&app, &pool, "ops@example.com").await;
    let (_, user_id) = register(&app, "star@example.com", None).await;

    sqlx::query(
        "INSERT INTO milestones (user_id, tier, amount_cents, status, created_at)
         VALUES (?1, 100, 2000, 'pending', ?2)",
    )
    .bind(user_id)
    .bind(chrono::Utc::now())
    .execute(&pool)
    .await
    .unwrap();

    let (status, list) = request(
        &app,
        Method::GET,
        "/admin/milestones?status=pending",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
    let id = list[0]["id"].as_i64().unwrap();

    let (status, m) = request(
        &app,
        Method::POST,
        &format!("/admin/milestones/{id}/approve"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(m["status"], "approved");

    // $20 credited.
    let (balance,): (i64,) = sqlx::query_as("SELECT balance FROM users WHERE id = ?1")
        .bind(user_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(balance, 20);

    // Double decision rejected.
    let (status, _) = request(
        &app,
        Method::POST,
        &format!("/admin/milestones/{id}/deny"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn contests_listing_and_admin_create() {
    let (app, pool) = test_app().await;
    let (admin, _) = register_admin(&app, &pool, "ops@example.com").await;
    let (user, _) = register(&app, "fan@example.com", None).await;

    let (status, contests) = request(&app, Method::GET, "/contests", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(contests.as_array().unwrap().len(), 2);

    // Non-admin creation is rejected.
    let (status, _) = request(
        &app,
        Method::POST,
        "/contests",
        Some(&user),
        Some(json!({ "title": "X", "sport": "NFL", "entry_fee": 100, "prize_pool": 1000 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = request(
        &app,
        Method::POST,
        "/contests",
        Some(&admin),
        Some(json!({ "title": "MNF Special", "sport": "NFL", "entry_fee": 200, "prize_pool": 2500 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["title"], "MNF Special");
    assert_eq!(created["status"], "open");
}

#[tokio::test]
async fn admin_match_management() {
    let (app, pool) = test_app().await;
    let (admin, _) = register_admin(&app, &pool, "ops@example.com").await;

    let (status, m) = request(
        &app,
        Method::POST,
        "/matches",
        Some(&admin),
        Some(json!({
            "home_team": "GB Packers",
            "away_team": "CHI Bears",
            "start_time": "2026-09-13T17:00:00Z"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = m["id"].as_i64().unwrap();
    assert_eq!(m["status"], "scheduled");

    // Push it live with a partial update.
    let (status, m) = request(
        &app,
        Method::PUT,
        &format!("/matches/{id}"),
        Some(&admin),
        Some(json!({ "status": "live", "home_score": 7, "away_score": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(m["status"], "live");
    assert_eq!(m["home_score"].as_i64().unwrap(), 7);

    // Settling a live match without finishing it is rejected.
    let (status, _) = request(
        &app,
        Method::PUT,
        "/matches/999",
        Some(&admin),
        Some(json!({ "status": "live" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn image_routes_redirect_when_disabled() {
    let (app, _pool) = test_app().await;
    let (status, _) = request(&app, Method::GET, "/images/team/kc", None, None).await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
}
