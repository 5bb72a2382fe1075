use std::sync::Arc;

use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};

use admingate_backend::app_data::AppData;
use admingate_backend::config::AppSettings;
use admingate_backend::services::authorization::SUPERUSER_ROLE;
use admingate_backend::services::{RecordingMailer, SystemClock};
use admingate_backend::stores::{RoleStore, SettingsStore, UserStore};

pub struct TestApp {
    pub db: DatabaseConnection,
    pub data: AppData,
    pub mailer: Arc<RecordingMailer>,
}

/// Fresh in-memory application with migrations applied and default
/// settings seeded; outgoing mail is captured for assertions.
pub async fn setup() -> TestApp {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to create test database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    SettingsStore::new(db.clone())
        .ensure_defaults()
        .await
        .expect("Failed to seed settings");

    let settings = AppSettings::for_tests();
    let mailer = Arc::new(RecordingMailer::default());
    let data = AppData::build(db.clone(), &settings, mailer.clone(), Arc::new(SystemClock));

    TestApp { db, data, mailer }
}

impl TestApp {
    /// Create a user holding the superuser role
    #[allow(dead_code)]
    pub async fn seed_superuser(&self, email: &str) -> String {
        let user_store = UserStore::new(self.db.clone());
        let role_store = RoleStore::new(self.db.clone());

        let user = user_store
            .create_user("Root".to_string(), email.to_string(), None, true)
            .await
            .expect("Failed to create superuser");
        let role = role_store
            .create(SUPERUSER_ROLE.to_string(), None)
            .await
            .expect("Failed to create superuser role");
        user_store
            .sync_roles(&user.id, &[role.id])
            .await
            .expect("Failed to assign superuser role");

        user.id
    }
}

/// Register an account over HTTP and redeem the delivered link,
/// returning the bearer session id
#[allow(dead_code)]
pub async fn signup<E: poem::Endpoint>(
    app: &TestApp,
    cli: &poem::test::TestClient<E>,
    name: &str,
    email: &str,
) -> String {
    cli.post("/auth/magic/register")
        .body_json(&serde_json::json!({"name": name, "email": email}))
        .send()
        .await
        .assert_status_is_ok();

    let sent = app.mailer.sent();
    let link = &sent.last().expect("no login link delivered").login_url;
    let (token, expires, signature) = parse_login_url(link);

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

/// Split a delivered login URL back into its query parts
pub fn parse_login_url(url: &str) -> (String, i64, String) {
    let query = url.split_once('?').expect("login URL has no query").1;
    let mut token = None;
    let mut expires = None;
    let mut signature = None;
    for pair in query.split('&') {
        let (key, value) = pair.split_once('=').expect("malformed query pair");
        match key {
            "token" => token = Some(value.to_string()),
            "expires" => expires = Some(value.parse().expect("expires is numeric")),
            "signature" => signature = Some(value.to_string()),
            _ => {}
        }
    }
    (
        token.expect("token param"),
        expires.expect("expires param"),
        signature.expect("signature param"),
    )
}
