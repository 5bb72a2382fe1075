use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::{AppSettings, PasswordlessFlag};
use crate::services::{
    AdminService, AuthorizationGuard, Clock, LinkSigner, LoginLinkMailer, MagicLinkService,
    PasswordPolicyEngine, RateLimiter, SessionRegistry, SystemClock, TokenStore, TracingMailer,
};
use crate::stores::{
    AuditStore, PermissionStore, RoleStore, SessionStore, SettingsStore, UserStore,
};

/// Shared application state handed to every API endpoint
#[derive(Clone)]
pub struct AppData {
    pub magic_link: Arc<MagicLinkService>,
    pub session_registry: Arc<SessionRegistry>,
    pub password_policy: Arc<PasswordPolicyEngine>,
    pub admin: Arc<AdminService>,
    pub audit_store: Arc<AuditStore>,
    pub settings_store: Arc<SettingsStore>,
    pub user_store: Arc<UserStore>,
}

impl AppData {
    /// Wire the full service graph over one database connection
    ///
    /// `mailer` and `clock` are injection points: production passes
    /// `TracingMailer` and `SystemClock`, tests substitute recording
    /// and fixed implementations.
    pub fn build(
        db: DatabaseConnection,
        settings: &AppSettings,
        mailer: Arc<dyn LoginLinkMailer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let user_store = Arc::new(UserStore::new(db.clone()));
        let role_store = Arc::new(RoleStore::new(db.clone()));
        let permission_store = Arc::new(PermissionStore::new(db.clone()));
        let session_store = Arc::new(SessionStore::new(db.clone()));
        let settings_store = Arc::new(SettingsStore::new(db.clone()));
        let audit_store = Arc::new(AuditStore::new(db));

        let token_store = Arc::new(TokenStore::new(clock.clone()));
        let rate_limiter = Arc::new(RateLimiter::new(clock.clone()));
        let passwordless = Arc::new(PasswordlessFlag::new(settings_store.clone()));

        let session_registry = Arc::new(SessionRegistry::new(
            session_store,
            user_store.clone(),
            token_store.clone(),
            audit_store.clone(),
            clock.clone(),
        ));

        let magic_link = Arc::new(MagicLinkService::new(
            user_store.clone(),
            token_store,
            audit_store.clone(),
            session_registry.clone(),
            rate_limiter.clone(),
            LinkSigner::new(settings.app_key.clone()),
            mailer,
            passwordless.clone(),
            clock.clone(),
            settings.rate_limits,
            settings.base_url.clone(),
        ));

        let password_policy = Arc::new(PasswordPolicyEngine::new(
            user_store.clone(),
            settings_store.clone(),
            audit_store.clone(),
            rate_limiter,
            clock,
            settings.rate_limits.password_change,
        ));

        let guard = Arc::new(AuthorizationGuard::new(
            user_store.clone(),
            settings.protected_roles.clone(),
            settings.protected_permissions.clone(),
        ));

        let admin = Arc::new(AdminService::new(
            role_store,
            permission_store,
            user_store.clone(),
            settings_store.clone(),
            audit_store.clone(),
            session_registry.clone(),
            guard,
            passwordless,
        ));

        Self {
            magic_link,
            session_registry,
            password_policy,
            admin,
            audit_store,
            settings_store,
            user_store,
        }
    }

    /// Production wiring: system clock, log-emitting mailer
    pub fn new(db: DatabaseConnection, settings: &AppSettings) -> Self {
        Self::build(
            db,
            settings,
            Arc::new(TracingMailer),
            Arc::new(SystemClock),
        )
    }
}
