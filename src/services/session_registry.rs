use std::sync::Arc;

use crate::errors::{AuthError, InternalError};
use crate::services::audit_logger;
use crate::services::clock::Clock;
use crate::services::crypto;
use crate::services::token_store::TokenStore;
use crate::stores::{AuditStore, SessionStore, UserStore};
use crate::types::db::{session, user};
use crate::types::internal::context::RequestContext;
use crate::types::internal::device::{parse_user_agent, DeviceInfo};

/// A session as presented to its owner: the stored row plus the parsed
/// device description and whether it is the session making the request
#[derive(Debug, Clone)]
pub struct SessionView {
    pub session: session::Model,
    pub device: DeviceInfo,
    pub is_current: bool,
}

/// Manages the user's signed-in devices
///
/// One session row per device; the session id doubles as the bearer
/// credential. "Current" is never stored, it is derived by comparing
/// against the caller's own session id at read time.
pub struct SessionRegistry {
    session_store: Arc<SessionStore>,
    user_store: Arc<UserStore>,
    token_store: Arc<TokenStore>,
    audit_store: Arc<AuditStore>,
    clock: Arc<dyn Clock>,
}

impl SessionRegistry {
    pub fn new(
        session_store: Arc<SessionStore>,
        user_store: Arc<UserStore>,
        token_store: Arc<TokenStore>,
        audit_store: Arc<AuditStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            session_store,
            user_store,
            token_store,
            audit_store,
            clock,
        }
    }

    /// Open a new session for the user from this request's device
    pub async fn create_session(
        &self,
        user_id: &str,
        context: &RequestContext,
    ) -> Result<session::Model, InternalError> {
        self.session_store
            .insert(
                crypto::generate_session_id(),
                user_id.to_string(),
                context.user_agent.clone(),
                context.ip_address.clone(),
                self.clock.now_timestamp(),
            )
            .await
    }

    /// Resolve a presented session id to its user
    ///
    /// Disabled accounts are signed out everywhere the moment any of
    /// their sessions touches the API.
    pub async fn authenticate(
        &self,
        session_id: &str,
    ) -> Result<(user::Model, session::Model), AuthError> {
        let Some(session) = self.session_store.find_by_id(session_id).await? else {
            return Err(AuthError::unauthenticated());
        };

        let user = match self.user_store.find_by_id(&session.user_id).await {
            Ok(user) => user,
            Err(InternalError::User(_)) => {
                // Owner was deleted; the session is orphaned
                self.session_store.delete_all_for_user(&session.user_id).await?;
                return Err(AuthError::unauthenticated());
            }
            Err(other) => return Err(other.into()),
        };

        if user.disabled {
            self.terminate_all_for_user(&user.id, None).await?;
            return Err(AuthError::account_disabled());
        }

        self.session_store
            .touch(session_id, self.clock.now_timestamp())
            .await?;

        Ok((user, session))
    }

    /// List the user's sessions, most recently active first
    pub async fn list(
        &self,
        user_id: &str,
        current_session_id: &str,
    ) -> Result<Vec<SessionView>, InternalError> {
        let sessions = self.session_store.list_for_user(user_id).await?;

        Ok(sessions
            .into_iter()
            .map(|session| {
                let device = session
                    .user_agent
                    .as_deref()
                    .map(parse_user_agent)
                    .unwrap_or_else(DeviceInfo::unknown);
                let is_current = session.id == current_session_id;
                SessionView {
                    session,
                    device,
                    is_current,
                }
            })
            .collect())
    }

    /// Terminate one of the user's other sessions
    ///
    /// The current session cannot terminate itself; sign-out is a
    /// separate operation.
    pub async fn terminate(
        &self,
        user_id: &str,
        current_session_id: &str,
        target_session_id: &str,
        context: &RequestContext,
    ) -> Result<(), AuthError> {
        if target_session_id == current_session_id {
            return Err(AuthError::cannot_terminate_current_session());
        }

        let deleted = self
            .session_store
            .delete_by_id(user_id, target_session_id)
            .await?;
        if deleted == 0 {
            return Err(AuthError::session_not_found());
        }

        audit_logger::log_session_terminated(&self.audit_store, user_id, target_session_id, context)
            .await;

        Ok(())
    }

    /// Terminate every session except the caller's own
    ///
    /// Requires the account password; a passwordless account has no
    /// credential to confirm with and is refused.
    pub async fn terminate_others(
        &self,
        user_id: &str,
        current_session_id: &str,
        password: &str,
        context: &RequestContext,
    ) -> Result<u64, AuthError> {
        let user = self.user_store.find_by_id(user_id).await?;

        let Some(stored_hash) = &user.password_hash else {
            return Err(AuthError::invalid_credentials());
        };
        if !crypto::verify_password(password, stored_hash)? {
            return Err(AuthError::invalid_credentials());
        }

        // Outstanding login links could re-open a session on another
        // device; void them along with the sessions
        self.token_store.remove_for_user(user_id);
        let deleted = self
            .session_store
            .delete_all_except(user_id, current_session_id)
            .await?;

        audit_logger::log_sessions_bulk_terminated(&self.audit_store, user_id, deleted, context)
            .await;

        Ok(deleted)
    }

    /// Sign the user out everywhere and void their outstanding login links
    ///
    /// `except_session_id` keeps one session alive, so an admin clearing
    /// their own devices does not cut off the session doing the clearing.
    pub async fn terminate_all_for_user(
        &self,
        user_id: &str,
        except_session_id: Option<&str>,
    ) -> Result<u64, InternalError> {
        self.token_store.remove_for_user(user_id);
        match except_session_id {
            Some(keep) => self.session_store.delete_all_except(user_id, keep).await,
            None => self.session_store.delete_all_for_user(user_id).await,
        }
    }

    /// Sign out the calling session
    pub async fn sign_out(&self, user_id: &str, session_id: &str) -> Result<(), InternalError> {
        self.session_store.delete_by_id(user_id, session_id).await?;
        Ok(())
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::clock::test_clock::FixedClock;
    use crate::services::clock::SystemClock;
    use chrono::TimeZone;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    struct Fixture {
        registry: SessionRegistry,
        user_store: Arc<UserStore>,
    }

    async fn setup() -> Fixture {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        let clock = Arc::new(FixedClock::at(
            chrono::Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        ));
        let user_store = Arc::new(UserStore::new(db.clone()));
        let registry = SessionRegistry::new(
            Arc::new(SessionStore::new(db.clone())),
            user_store.clone(),
            Arc::new(TokenStore::new(Arc::new(SystemClock))),
            Arc::new(AuditStore::new(db)),
            clock,
        );

        Fixture {
            registry,
            user_store,
        }
    }

    async fn seed_user(fixture: &Fixture, password: Option<&str>) -> user::Model {
        fixture
            .user_store
            .create_user(
                "Alice".to_string(),
                "a@example.com".to_string(),
                password.map(|p| crypto::hash_password(p).unwrap()),
                true,
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_marks_current_session() {
        let fixture = setup().await;
        let user = seed_user(&fixture, None).await;

        let context = RequestContext::new(
            Some("10.0.0.1".to_string()),
            Some("Mozilla/5.0 (Windows NT 10.0) Chrome/120.0".to_string()),
        );
        let current = fixture.registry.create_session(&user.id, &context).await.unwrap();
        let other = fixture
            .registry
            .create_session(&user.id, &RequestContext::default())
            .await
            .unwrap();

        let views = fixture.registry.list(&user.id, &current.id).await.unwrap();
        assert_eq!(views.len(), 2);

        let current_view = views.iter().find(|v| v.session.id == current.id).unwrap();
        let other_view = views.iter().find(|v| v.session.id == other.id).unwrap();
        assert!(current_view.is_current);
        assert!(!other_view.is_current);
        assert_eq!(current_view.device.platform, "Windows");
    }

    #[tokio::test]
    async fn test_cannot_terminate_current_session() {
        let fixture = setup().await;
        let user = seed_user(&fixture, None).await;
        let current = fixture
            .registry
            .create_session(&user.id, &RequestContext::default())
            .await
            .unwrap();

        let result = fixture
            .registry
            .terminate(&user.id, &current.id, &current.id, &RequestContext::default())
            .await;

        assert!(matches!(
            result,
            Err(AuthError::CannotTerminateCurrentSession(_))
        ));
    }

    #[tokio::test]
    async fn test_terminate_unknown_session_not_found() {
        let fixture = setup().await;
        let user = seed_user(&fixture, None).await;
        let current = fixture
            .registry
            .create_session(&user.id, &RequestContext::default())
            .await
            .unwrap();

        let result = fixture
            .registry
            .terminate(&user.id, &current.id, "missing", &RequestContext::default())
            .await;

        assert!(matches!(result, Err(AuthError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_terminate_others_requires_correct_password() {
        let fixture = setup().await;
        let user = seed_user(&fixture, Some("Str0ng!pw")).await;
        let current = fixture
            .registry
            .create_session(&user.id, &RequestContext::default())
            .await
            .unwrap();
        fixture
            .registry
            .create_session(&user.id, &RequestContext::default())
            .await
            .unwrap();

        let result = fixture
            .registry
            .terminate_others(&user.id, &current.id, "wrong", &RequestContext::default())
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));

        // Nothing was deleted on the failed attempt
        let views = fixture.registry.list(&user.id, &current.id).await.unwrap();
        assert_eq!(views.len(), 2);

        let deleted = fixture
            .registry
            .terminate_others(&user.id, &current.id, "Str0ng!pw", &RequestContext::default())
            .await
            .unwrap();
        assert_eq!(deleted, 1);
    }

    #[tokio::test]
    async fn test_passwordless_account_cannot_bulk_terminate() {
        let fixture = setup().await;
        let user = seed_user(&fixture, None).await;
        let current = fixture
            .registry
            .create_session(&user.id, &RequestContext::default())
            .await
            .unwrap();

        let result = fixture
            .registry
            .terminate_others(&user.id, &current.id, "anything", &RequestContext::default())
            .await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));
    }

    #[tokio::test]
    async fn test_terminate_all_can_keep_one_session() {
        let fixture = setup().await;
        let user = seed_user(&fixture, None).await;
        let keep = fixture
            .registry
            .create_session(&user.id, &RequestContext::default())
            .await
            .unwrap();
        fixture
            .registry
            .create_session(&user.id, &RequestContext::default())
            .await
            .unwrap();

        let deleted = fixture
            .registry
            .terminate_all_for_user(&user.id, Some(&keep.id))
            .await
            .unwrap();
        assert_eq!(deleted, 1);

        let views = fixture.registry.list(&user.id, &keep.id).await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].session.id, keep.id);
    }

    #[tokio::test]
    async fn test_disabled_account_is_signed_out_on_touch() {
        let fixture = setup().await;
        let user = seed_user(&fixture, None).await;
        let session = fixture
            .registry
            .create_session(&user.id, &RequestContext::default())
            .await
            .unwrap();

        fixture
            .user_store
            .update_account(&user.id, user.name.clone(), user.email.clone(), true, false)
            .await
            .unwrap();

        let result = fixture.registry.authenticate(&session.id).await;
        assert!(matches!(result, Err(AuthError::AccountDisabled(_))));

        // All sessions were removed, not just this one
        let views = fixture.registry.list(&user.id, &session.id).await.unwrap();
        assert!(views.is_empty());
    }
}
