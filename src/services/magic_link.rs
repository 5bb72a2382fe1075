use std::sync::Arc;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::settings::RateLimitSettings;
use crate::config::PasswordlessFlag;
use crate::errors::AuthError;
use crate::services::audit_logger;
use crate::services::clock::Clock;
use crate::services::crypto;
use crate::services::link_signer::LinkSigner;
use crate::services::mailer::LoginLinkMailer;
use crate::services::session_registry::SessionRegistry;
use crate::services::token_store::{TokenPayload, TokenStore, TOKEN_TTL_SECONDS};
use crate::stores::{AuditStore, UserStore};
use crate::types::db::{session, user};
use crate::types::internal::context::RequestContext;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid"))
}

/// Passwordless login flows: registration, login-link issuance and
/// token redemption
///
/// Every entry point first checks the global passwordless toggle; when
/// it is off the endpoints answer as if they did not exist. Issued
/// links carry two independent expiries, the signed URL timestamp and
/// the server-side token TTL, and redeeming consumes the token so a
/// link works exactly once.
pub struct MagicLinkService {
    user_store: Arc<UserStore>,
    token_store: Arc<TokenStore>,
    audit_store: Arc<AuditStore>,
    session_registry: Arc<SessionRegistry>,
    rate_limiter: Arc<crate::services::rate_limiter::RateLimiter>,
    link_signer: LinkSigner,
    mailer: Arc<dyn LoginLinkMailer>,
    passwordless: Arc<PasswordlessFlag>,
    clock: Arc<dyn Clock>,
    rate_limits: RateLimitSettings,
    base_url: String,
}

impl MagicLinkService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_store: Arc<UserStore>,
        token_store: Arc<TokenStore>,
        audit_store: Arc<AuditStore>,
        session_registry: Arc<SessionRegistry>,
        rate_limiter: Arc<crate::services::rate_limiter::RateLimiter>,
        link_signer: LinkSigner,
        mailer: Arc<dyn LoginLinkMailer>,
        passwordless: Arc<PasswordlessFlag>,
        clock: Arc<dyn Clock>,
        rate_limits: RateLimitSettings,
        base_url: String,
    ) -> Self {
        Self {
            user_store,
            token_store,
            audit_store,
            session_registry,
            rate_limiter,
            link_signer,
            mailer,
            passwordless,
            clock,
            rate_limits,
            base_url,
        }
    }

    /// Register a new account and send it a login link
    ///
    /// Registration through a delivered link doubles as email
    /// verification, so the account is created verified.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        context: &RequestContext,
    ) -> Result<user::Model, AuthError> {
        self.ensure_enabled().await?;

        let rate_key = format!("magic.register:{}", context.rate_limit_identity());
        if let Err(retry_after) = self
            .rate_limiter
            .hit(&rate_key, self.rate_limits.registration)
        {
            audit_logger::log_magic_link_denied(&self.audit_store, email, "rate_limited", context)
                .await;
            return Err(AuthError::rate_limited(retry_after));
        }

        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::validation("name", "The name field is required."));
        }
        if name.chars().count() > 255 {
            return Err(AuthError::validation(
                "name",
                "The name may not be greater than 255 characters.",
            ));
        }
        let email = Self::validate_email(email)?;

        let user = self
            .user_store
            .create_user(name.to_string(), email.clone(), None, true)
            .await?;

        audit_logger::log_user_registered(&self.audit_store, &user.id, &email, context).await;
        self.issue_link(&user, context).await?;

        Ok(user)
    }

    /// Send a login link to an existing account
    pub async fn request_login(
        &self,
        email: &str,
        context: &RequestContext,
    ) -> Result<(), AuthError> {
        self.ensure_enabled().await?;

        let rate_key = format!("magic.login:{}", context.rate_limit_identity());
        if let Err(retry_after) = self.rate_limiter.hit(&rate_key, self.rate_limits.login) {
            audit_logger::log_magic_link_denied(&self.audit_store, email, "rate_limited", context)
                .await;
            return Err(AuthError::rate_limited(retry_after));
        }

        let email = Self::validate_email(email)?;

        let Some(user) = self.user_store.find_by_email(&email).await? else {
            audit_logger::log_magic_link_denied(&self.audit_store, &email, "unknown_email", context)
                .await;
            return Err(AuthError::user_not_found());
        };

        if user.disabled {
            audit_logger::log_magic_link_denied(&self.audit_store, &email, "account_disabled", context)
                .await;
            return Err(AuthError::account_disabled());
        }

        self.issue_link(&user, context).await
    }

    /// Redeem a signed login link for a session
    ///
    /// Signature is verified before the token is looked up, so token
    /// state leaks nothing to callers holding forged links. The token's
    /// own TTL is checked on consume even when the URL expiry passes.
    pub async fn authenticate(
        &self,
        token: &str,
        expires: i64,
        signature: &str,
        context: &RequestContext,
    ) -> Result<(user::Model, session::Model), AuthError> {
        self.ensure_enabled().await?;

        let now = self.clock.now_timestamp();
        if !self.link_signer.verify(token, expires, signature, now)? {
            audit_logger::log_login_failure(&self.audit_store, "invalid_signature", context).await;
            return Err(AuthError::invalid_signature());
        }

        let Some(payload) = self.token_store.consume(token) else {
            audit_logger::log_login_failure(&self.audit_store, "expired_or_invalid_token", context)
                .await;
            return Err(AuthError::expired_or_invalid_token());
        };

        let user = match self.user_store.find_by_id(&payload.user_id).await {
            Ok(user) => user,
            Err(e) => {
                audit_logger::log_login_failure(&self.audit_store, "account_missing", context)
                    .await;
                return Err(e.into());
            }
        };

        if user.disabled {
            self.token_store.remove_for_user(&user.id);
            audit_logger::log_login_failure(&self.audit_store, "account_disabled", context).await;
            return Err(AuthError::account_disabled());
        }

        let session = self.session_registry.create_session(&user.id, context).await?;

        self.rate_limiter
            .clear(&format!("magic.login:{}", context.rate_limit_identity()));
        audit_logger::log_login_success(&self.audit_store, &user.id, &session.id, context).await;

        Ok((user, session))
    }

    /// Generate, store, sign and deliver a login link
    async fn issue_link(&self, user: &user::Model, context: &RequestContext) -> Result<(), AuthError> {
        let token = crypto::generate_token();
        self.token_store.put(
            token.clone(),
            TokenPayload {
                user_id: user.id.clone(),
                email: user.email.clone(),
            },
        );

        let expires = self.clock.now_timestamp() + TOKEN_TTL_SECONDS;
        let link = self.link_signer.sign(&token, expires)?;
        let login_url = self.link_signer.login_url(&self.base_url, &link);

        self.mailer
            .send_login_link(&user.email, &user.name, &login_url)
            .await?;

        audit_logger::log_magic_link_issued(&self.audit_store, &user.id, &user.email, context)
            .await;

        Ok(())
    }

    async fn ensure_enabled(&self) -> Result<(), AuthError> {
        if !self.passwordless.is_enabled().await? {
            return Err(AuthError::feature_disabled());
        }
        Ok(())
    }

    fn validate_email(email: &str) -> Result<String, AuthError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || email.chars().count() > 255 || !email_regex().is_match(&email) {
            return Err(AuthError::validation(
                "email",
                "The email must be a valid email address.",
            ));
        }
        Ok(email)
    }
}

impl std::fmt::Debug for MagicLinkService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MagicLinkService")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::clock::test_clock::FixedClock;
    use crate::services::mailer::RecordingMailer;
    use crate::services::rate_limiter::RateLimiter;
    use crate::stores::{SessionStore, SettingsStore};
    use chrono::TimeZone;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    struct Fixture {
        clock: Arc<FixedClock>,
        service: MagicLinkService,
        mailer: Arc<RecordingMailer>,
        settings_store: Arc<SettingsStore>,
        signer: LinkSigner,
    }

    const TEST_KEY: &str = "test-app-key-minimum-32-characters-long";

    async fn setup() -> Fixture {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        let clock: Arc<FixedClock> = Arc::new(FixedClock::at(
            chrono::Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        ));
        let user_store = Arc::new(UserStore::new(db.clone()));
        let token_store = Arc::new(TokenStore::new(clock.clone()));
        let audit_store = Arc::new(AuditStore::new(db.clone()));
        let settings_store = Arc::new(SettingsStore::new(db.clone()));
        settings_store.ensure_defaults().await.unwrap();
        let session_registry = Arc::new(SessionRegistry::new(
            Arc::new(SessionStore::new(db)),
            user_store.clone(),
            token_store.clone(),
            audit_store.clone(),
            clock.clone(),
        ));
        let mailer = Arc::new(RecordingMailer::default());

        let service = MagicLinkService::new(
            user_store,
            token_store,
            audit_store,
            session_registry,
            Arc::new(RateLimiter::new(clock.clone())),
            LinkSigner::new(TEST_KEY.to_string()),
            mailer.clone(),
            Arc::new(PasswordlessFlag::new(settings_store.clone())),
            clock.clone(),
            RateLimitSettings::default(),
            "http://localhost:3000".to_string(),
        );

        Fixture {
            clock,
            service,
            mailer,
            settings_store,
            signer: LinkSigner::new(TEST_KEY.to_string()),
        }
    }

    fn context() -> RequestContext {
        RequestContext::new(Some("203.0.113.9".to_string()), Some("TestAgent/1.0".to_string()))
    }

    /// Pull token/expires/signature back out of the delivered URL
    fn parse_link(url: &str) -> (String, i64, String) {
        let query = url.split_once('?').unwrap().1;
        let mut token = None;
        let mut expires = None;
        let mut signature = None;
        for pair in query.split('&') {
            let (key, value) = pair.split_once('=').unwrap();
            match key {
                "token" => token = Some(value.to_string()),
                "expires" => expires = Some(value.parse().unwrap()),
                "signature" => signature = Some(value.to_string()),
                _ => {}
            }
        }
        (token.unwrap(), expires.unwrap(), signature.unwrap())
    }

    #[tokio::test]
    async fn test_register_then_authenticate() {
        let fixture = setup().await;

        let user = fixture
            .service
            .register("Alice", "Alice@Example.com", &context())
            .await
            .unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert!(user.email_verified_at.is_some());

        let sent = fixture.mailer.sent();
        assert_eq!(sent.len(), 1);

        let (token, expires, signature) = parse_link(&sent[0].login_url);
        let (authed, session) = fixture
            .service
            .authenticate(&token, expires, &signature, &context())
            .await
            .unwrap();

        assert_eq!(authed.id, user.id);
        assert_eq!(session.user_id, user.id);
    }

    #[tokio::test]
    async fn test_link_is_single_use() {
        let fixture = setup().await;

        fixture
            .service
            .register("Alice", "a@example.com", &context())
            .await
            .unwrap();
        let (token, expires, signature) = parse_link(&fixture.mailer.sent()[0].login_url);

        fixture
            .service
            .authenticate(&token, expires, &signature, &context())
            .await
            .unwrap();

        let replay = fixture
            .service
            .authenticate(&token, expires, &signature, &context())
            .await;
        assert!(matches!(replay, Err(AuthError::ExpiredOrInvalidToken(_))));
    }

    #[tokio::test]
    async fn test_token_expires_after_ttl() {
        let fixture = setup().await;

        fixture
            .service
            .register("Alice", "a@example.com", &context())
            .await
            .unwrap();
        let (token, expires, signature) = parse_link(&fixture.mailer.sent()[0].login_url);

        fixture.clock.advance_seconds(TOKEN_TTL_SECONDS + 1);

        let result = fixture
            .service
            .authenticate(&token, expires, &signature, &context())
            .await;
        // URL expiry trips first; both gates are past due
        assert!(matches!(result, Err(AuthError::InvalidSignature(_))));
    }

    #[tokio::test]
    async fn test_tampered_signature_rejected_without_consuming_token() {
        let fixture = setup().await;

        fixture
            .service
            .register("Alice", "a@example.com", &context())
            .await
            .unwrap();
        let (token, expires, _) = parse_link(&fixture.mailer.sent()[0].login_url);

        let forged = fixture.signer.sign(&token, expires + 1000).unwrap();
        let result = fixture
            .service
            .authenticate(&token, expires, &forged.signature, &context())
            .await;
        assert!(matches!(result, Err(AuthError::InvalidSignature(_))));

        // The failed attempt did not burn the token
        let (_, _, signature) = parse_link(&fixture.mailer.sent()[0].login_url);
        assert!(fixture
            .service
            .authenticate(&token, expires, &signature, &context())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_registration_rate_limit() {
        let fixture = setup().await;

        for i in 0..3 {
            fixture
                .service
                .register("Alice", &format!("a{i}@example.com"), &context())
                .await
                .unwrap();
        }

        let result = fixture
            .service
            .register("Alice", "a9@example.com", &context())
            .await;
        match result {
            Err(err @ AuthError::RateLimited(_)) => {
                let retry = err.retry_after_seconds().unwrap();
                assert!(retry > 0 && retry <= 300);
            }
            other => panic!("expected rate limit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_login_request_for_unknown_email() {
        let fixture = setup().await;

        let result = fixture
            .service
            .request_login("missing@example.com", &context())
            .await;
        assert!(matches!(result, Err(AuthError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_disabled_feature_hides_endpoints() {
        let fixture = setup().await;

        fixture
            .settings_store
            .set_passwordless_login(false)
            .await
            .unwrap();
        // Simulates the settings-update path invalidating the cache
        fixture.service.passwordless.invalidate();

        let result = fixture
            .service
            .register("Alice", "a@example.com", &context())
            .await;
        assert!(matches!(result, Err(AuthError::FeatureDisabled(_))));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let fixture = setup().await;

        fixture
            .service
            .register("Alice", "a@example.com", &context())
            .await
            .unwrap();
        let result = fixture
            .service
            .register("Alan", "a@example.com", &context())
            .await;

        assert!(matches!(result, Err(AuthError::ValidationError(_))));
    }
}
