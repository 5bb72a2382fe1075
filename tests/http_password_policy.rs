mod common;

use poem::http::StatusCode;
use poem::test::TestClient;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::json;

use admingate_backend::types::db::user;
use common::{parse_login_url, setup, signup};

async fn login<E: poem::Endpoint>(
    app: &common::TestApp,
    cli: &TestClient<E>,
    email: &str,
) -> String {
    cli.post("/auth/magic/login")
        .body_json(&json!({"email": email}))
        .send()
        .await
        .assert_status_is_ok();

    let sent = app.mailer.sent();
    let (token, expires, signature) = parse_login_url(&sent.last().unwrap().login_url);
    let resp = cli
        .get(format!(
            "/auth/magic/authenticate?token={token}&expires={expires}&signature={signature}"
        ))
        .send()
        .await;
    resp.assert_status_is_ok();
    let body = resp.json().await;
    body.value().object().get("session_id").string().to_string()
}

async fn user_id_of<E: poem::Endpoint>(cli: &TestClient<E>, session: &str) -> String {
    let resp = cli
        .get("/auth/me")
        .header("authorization", format!("Bearer {session}"))
        .send()
        .await;
    let body = resp.json().await;
    body.value().object().get("id").string().to_string()
}

/// Backdate the stored expiry so the next gate check sees it as past
async fn backdate_expiry(app: &common::TestApp, user_id: &str) {
    let model = user::Entity::find_by_id(user_id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    let mut active: user::ActiveModel = model.into();
    active.password_expires_at = Set(Some(0));
    active.update(&app.db).await.unwrap();
}

#[tokio::test]
async fn test_weak_password_is_rejected() {
    let app = setup().await;
    let cli = TestClient::new(admingate_backend::build_route(
        app.data.clone(),
        "http://localhost",
    ));
    let session = signup(&app, &cli, "Alice", "alice@example.com").await;

    // Two rejects plus one accept stays inside the change-rate window
    for weak in ["Sh0r!t", "NoSymbol11"] {
        let resp = cli
            .put("/auth/password")
            .header("authorization", format!("Bearer {session}"))
            .body_json(&json!({"current_password": null, "new_password": weak}))
            .send()
            .await;
        resp.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    // Exactly 8 chars covering all classes is acceptable
    cli.put("/auth/password")
        .header("authorization", format!("Bearer {session}"))
        .body_json(&json!({"current_password": null, "new_password": "Short1!A"}))
        .send()
        .await
        .assert_status_is_ok();
}

#[tokio::test]
async fn test_expired_password_gates_and_recovers() {
    let app = setup().await;
    app.seed_superuser("root@example.com").await;
    let cli = TestClient::new(admingate_backend::build_route(
        app.data.clone(),
        "http://localhost",
    ));
    let admin_session = login(&app, &cli, "root@example.com").await;
    let session = signup(&app, &cli, "Alice", "alice@example.com").await;
    let user_id = user_id_of(&cli, &session).await;

    // Give the account a password, then force it past expiry
    cli.put("/auth/password")
        .header("authorization", format!("Bearer {session}"))
        .body_json(&json!({"current_password": null, "new_password": "Str0ng!pw"}))
        .send()
        .await
        .assert_status_is_ok();

    cli.put("/admin/settings/password-expiry")
        .header("authorization", format!("Bearer {admin_session}"))
        .body_json(&json!({"enabled": true}))
        .send()
        .await
        .assert_status_is_ok();

    backdate_expiry(&app, &user_id).await;

    // Gated everywhere except the change endpoint
    cli.get("/auth/me")
        .header("authorization", format!("Bearer {session}"))
        .send()
        .await
        .assert_status(StatusCode::CONFLICT);
    cli.get("/sessions/")
        .header("authorization", format!("Bearer {session}"))
        .send()
        .await
        .assert_status(StatusCode::CONFLICT);

    let resp = cli
        .put("/auth/password")
        .header("authorization", format!("Bearer {session}"))
        .body_json(&json!({"current_password": "Str0ng!pw", "new_password": "N3w!Secret"}))
        .send()
        .await;
    resp.assert_status_is_ok();
    let body = resp.json().await;
    let new_expiry = body
        .value()
        .object()
        .get("password_expires_at")
        .i64();
    assert!(new_expiry > chrono::Utc::now().timestamp());

    // The gate lifts immediately, and the account reports roughly three
    // months of validity for the expiry banner
    let resp = cli
        .get("/auth/me")
        .header("authorization", format!("Bearer {session}"))
        .send()
        .await;
    resp.assert_status_is_ok();
    let body = resp.json().await;
    let days = body.value().object().get("password_expires_in_days").i64();
    assert!((85..=93).contains(&days), "unexpected days remaining: {days}");
}

#[tokio::test]
async fn test_forced_change_gates_until_completed() {
    let app = setup().await;
    app.seed_superuser("root@example.com").await;
    let cli = TestClient::new(admingate_backend::build_route(
        app.data.clone(),
        "http://localhost",
    ));
    let admin_session = login(&app, &cli, "root@example.com").await;
    let session = signup(&app, &cli, "Bob", "bob@example.com").await;
    let user_id = user_id_of(&cli, &session).await;

    cli.put(format!("/admin/users/{user_id}"))
        .header("authorization", format!("Bearer {admin_session}"))
        .body_json(&json!({
            "name": "Bob",
            "email": "bob@example.com",
            "disabled": false,
            "force_password_change": true,
            "role_ids": [],
            "permission_ids": []
        }))
        .send()
        .await
        .assert_status_is_ok();

    cli.get("/auth/me")
        .header("authorization", format!("Bearer {session}"))
        .send()
        .await
        .assert_status(StatusCode::CONFLICT);

    cli.put("/auth/password")
        .header("authorization", format!("Bearer {session}"))
        .body_json(&json!({"current_password": null, "new_password": "Str0ng!pw"}))
        .send()
        .await
        .assert_status_is_ok();

    cli.get("/auth/me")
        .header("authorization", format!("Bearer {session}"))
        .send()
        .await
        .assert_status_is_ok();
}

#[tokio::test]
async fn test_same_password_rejected() {
    let app = setup().await;
    let cli = TestClient::new(admingate_backend::build_route(
        app.data.clone(),
        "http://localhost",
    ));
    let session = signup(&app, &cli, "Alice", "alice@example.com").await;

    cli.put("/auth/password")
        .header("authorization", format!("Bearer {session}"))
        .body_json(&json!({"current_password": null, "new_password": "Str0ng!pw"}))
        .send()
        .await
        .assert_status_is_ok();

    let resp = cli
        .put("/auth/password")
        .header("authorization", format!("Bearer {session}"))
        .body_json(&json!({"current_password": "Str0ng!pw", "new_password": "Str0ng!pw"}))
        .send()
        .await;
    resp.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}
