mod common;

use poem::http::StatusCode;
use poem::test::TestClient;
use serde_json::json;

use common::{parse_login_url, setup};

#[tokio::test]
async fn test_health() {
    let app = setup().await;
    let cli = TestClient::new(admingate_backend::build_route(
        app.data.clone(),
        "http://localhost",
    ));

    let resp = cli.get("/health").send().await;
    resp.assert_status_is_ok();
    resp.assert_text("ok").await;
}

#[tokio::test]
async fn test_register_authenticate_and_me() {
    let app = setup().await;
    let cli = TestClient::new(admingate_backend::build_route(
        app.data.clone(),
        "http://localhost",
    ));

    let resp = cli
        .post("/auth/magic/register")
        .body_json(&json!({"name": "Alice", "email": "alice@example.com"}))
        .send()
        .await;
    resp.assert_status_is_ok();

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    let (token, expires, signature) = parse_login_url(&sent[0].login_url);

    let resp = cli
        .get(format!(
            "/auth/magic/authenticate?token={token}&expires={expires}&signature={signature}"
        ))
        .send()
        .await;
    resp.assert_status_is_ok();

    let body = resp.json().await;
    let session_id = body
        .value()
        .object()
        .get("session_id")
        .string()
        .to_string();
    assert!(!session_id.is_empty());

    let resp = cli
        .get("/auth/me")
        .header("authorization", format!("Bearer {session_id}"))
        .send()
        .await;
    resp.assert_status_is_ok();
    let body = resp.json().await;
    let me = body.value().object();
    assert_eq!(me.get("email").string(), "alice@example.com");
    assert_eq!(me.get("email_verified").bool(), true);
}

#[tokio::test]
async fn test_login_link_replay_is_rejected() {
    let app = setup().await;
    let cli = TestClient::new(admingate_backend::build_route(
        app.data.clone(),
        "http://localhost",
    ));

    cli.post("/auth/magic/register")
        .body_json(&json!({"name": "Alice", "email": "alice@example.com"}))
        .send()
        .await
        .assert_status_is_ok();

    let (token, expires, signature) = parse_login_url(&app.mailer.sent()[0].login_url);
    let url = format!(
        "/auth/magic/authenticate?token={token}&expires={expires}&signature={signature}"
    );

    cli.get(&url).send().await.assert_status_is_ok();

    let replay = cli.get(&url).send().await;
    replay.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_registration_rate_limit_returns_429() {
    let app = setup().await;
    let cli = TestClient::new(admingate_backend::build_route(
        app.data.clone(),
        "http://localhost",
    ));

    for i in 0..3 {
        cli.post("/auth/magic/register")
            .body_json(&json!({"name": "Alice", "email": format!("a{i}@example.com")}))
            .send()
            .await
            .assert_status_is_ok();
    }

    let resp = cli
        .post("/auth/magic/register")
        .body_json(&json!({"name": "Alice", "email": "a9@example.com"}))
        .send()
        .await;
    resp.assert_status(StatusCode::TOO_MANY_REQUESTS);

    let body = resp.json().await;
    let retry = body.value().object().get("retry_after_seconds").i64();
    assert!(retry > 0 && retry <= 300);
}

#[tokio::test]
async fn test_unknown_email_login_request_is_404() {
    let app = setup().await;
    let cli = TestClient::new(admingate_backend::build_route(
        app.data.clone(),
        "http://localhost",
    ));

    let resp = cli
        .post("/auth/magic/login")
        .body_json(&json!({"email": "ghost@example.com"}))
        .send()
        .await;
    resp.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_email_is_422() {
    let app = setup().await;
    let cli = TestClient::new(admingate_backend::build_route(
        app.data.clone(),
        "http://localhost",
    ));

    let resp = cli
        .post("/auth/magic/register")
        .body_json(&json!({"name": "Alice", "email": "not-an-email"}))
        .send()
        .await;
    resp.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_logout_invalidates_session() {
    let app = setup().await;
    let cli = TestClient::new(admingate_backend::build_route(
        app.data.clone(),
        "http://localhost",
    ));

    cli.post("/auth/magic/register")
        .body_json(&json!({"name": "Alice", "email": "alice@example.com"}))
        .send()
        .await
        .assert_status_is_ok();
    let (token, expires, signature) = parse_login_url(&app.mailer.sent()[0].login_url);
    let resp = cli
        .get(format!(
            "/auth/magic/authenticate?token={token}&expires={expires}&signature={signature}"
        ))
        .send()
        .await;
    let body = resp.json().await;
    let session_id = body
        .value()
        .object()
        .get("session_id")
        .string()
        .to_string();

    cli.post("/auth/logout")
        .header("authorization", format!("Bearer {session_id}"))
        .send()
        .await
        .assert_status_is_ok();

    let resp = cli
        .get("/auth/me")
        .header("authorization", format!("Bearer {session_id}"))
        .send()
        .await;
    resp.assert_status(StatusCode::UNAUTHORIZED);
}
