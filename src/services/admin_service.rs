use std::sync::Arc;

use crate::config::PasswordlessFlag;
use crate::errors::AdminError;
use crate::services::audit_logger;
use crate::services::authorization::{AuthorizationGuard, SUPERUSER_ROLE};
use crate::services::session_registry::{SessionRegistry, SessionView};
use crate::stores::{AuditStore, PermissionStore, RoleStore, SettingsStore, UserStore};
use crate::types::db::{permission, role, setting, user};
use crate::types::internal::audit::EventType;
use crate::types::internal::context::RequestContext;

/// Administrative surface: role, permission, user and settings management
///
/// Every mutation runs through the same shape: permission check,
/// protected-entity check, store write, audit write. Refused attempts
/// on protected entities are audited too.
pub struct AdminService {
    role_store: Arc<RoleStore>,
    permission_store: Arc<PermissionStore>,
    user_store: Arc<UserStore>,
    settings_store: Arc<SettingsStore>,
    audit_store: Arc<AuditStore>,
    session_registry: Arc<SessionRegistry>,
    guard: Arc<AuthorizationGuard>,
    passwordless: Arc<PasswordlessFlag>,
}

impl AdminService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        role_store: Arc<RoleStore>,
        permission_store: Arc<PermissionStore>,
        user_store: Arc<UserStore>,
        settings_store: Arc<SettingsStore>,
        audit_store: Arc<AuditStore>,
        session_registry: Arc<SessionRegistry>,
        guard: Arc<AuthorizationGuard>,
        passwordless: Arc<PasswordlessFlag>,
    ) -> Self {
        Self {
            role_store,
            permission_store,
            user_store,
            settings_store,
            audit_store,
            session_registry,
            guard,
            passwordless,
        }
    }

    pub fn guard(&self) -> &AuthorizationGuard {
        &self.guard
    }

    // ----- roles -----

    pub async fn list_roles(&self, admin_id: &str) -> Result<Vec<role::Model>, AdminError> {
        self.guard.require(admin_id, "manage-roles").await?;
        Ok(self.role_store.list().await?)
    }

    pub async fn role_permissions(
        &self,
        admin_id: &str,
        role_id: &str,
    ) -> Result<Vec<permission::Model>, AdminError> {
        self.guard.require(admin_id, "manage-roles").await?;
        self.role_store.find_by_id(role_id).await?;
        Ok(self.role_store.permissions_of(role_id).await?)
    }

    pub async fn create_role(
        &self,
        admin_id: &str,
        name: &str,
        description: Option<String>,
        context: &RequestContext,
    ) -> Result<role::Model, AdminError> {
        self.guard.require(admin_id, "manage-roles").await?;
        AuthorizationGuard::validate_role_name(name)?;
        self.refuse_if_protected_role(admin_id, name, context).await?;

        let role = self.role_store.create(name.to_string(), description).await?;
        audit_logger::log_admin_mutation(
            &self.audit_store,
            EventType::RoleCreated,
            admin_id,
            &role.name,
            context,
        )
        .await;

        Ok(role)
    }

    pub async fn update_role(
        &self,
        admin_id: &str,
        role_id: &str,
        name: &str,
        description: Option<String>,
        permission_ids: &[String],
        context: &RequestContext,
    ) -> Result<role::Model, AdminError> {
        self.guard.require(admin_id, "manage-roles").await?;
        AuthorizationGuard::validate_role_name(name)?;

        let existing = self.role_store.find_by_id(role_id).await?;
        // Both directions are protected: renaming a system role away,
        // and renaming another role onto a system name
        self.refuse_if_protected_role(admin_id, &existing.name, context).await?;
        if name != existing.name {
            self.refuse_if_protected_role(admin_id, name, context).await?;
        }

        for permission_id in permission_ids {
            self.permission_store.find_by_id(permission_id).await?;
        }

        let role = self
            .role_store
            .update(role_id, name.to_string(), description)
            .await?;
        self.role_store.sync_permissions(role_id, permission_ids).await?;

        audit_logger::log_admin_mutation(
            &self.audit_store,
            EventType::RoleUpdated,
            admin_id,
            &role.name,
            context,
        )
        .await;

        Ok(role)
    }

    pub async fn delete_role(
        &self,
        admin_id: &str,
        role_id: &str,
        context: &RequestContext,
    ) -> Result<(), AdminError> {
        self.guard.require(admin_id, "manage-roles").await?;

        let role = self.role_store.find_by_id(role_id).await?;
        self.refuse_if_protected_role(admin_id, &role.name, context).await?;

        self.role_store.delete(role_id).await?;
        audit_logger::log_admin_mutation(
            &self.audit_store,
            EventType::RoleDeleted,
            admin_id,
            &role.name,
            context,
        )
        .await;

        Ok(())
    }

    // ----- permissions -----

    pub async fn list_permissions(
        &self,
        admin_id: &str,
    ) -> Result<Vec<permission::Model>, AdminError> {
        self.guard.require(admin_id, "manage-permissions").await?;
        Ok(self.permission_store.list().await?)
    }

    pub async fn create_permission(
        &self,
        admin_id: &str,
        name: &str,
        description: Option<String>,
        context: &RequestContext,
    ) -> Result<permission::Model, AdminError> {
        self.guard.require(admin_id, "manage-permissions").await?;
        AuthorizationGuard::validate_permission_name(name)?;
        // Matched case-insensitively, stored lowercase
        let name = name.to_lowercase();
        self.refuse_if_protected_permission(admin_id, &name, context).await?;

        let permission = self.permission_store.create(name, description).await?;
        audit_logger::log_admin_mutation(
            &self.audit_store,
            EventType::PermissionCreated,
            admin_id,
            &permission.name,
            context,
        )
        .await;

        Ok(permission)
    }

    pub async fn update_permission(
        &self,
        admin_id: &str,
        permission_id: &str,
        name: &str,
        description: Option<String>,
        context: &RequestContext,
    ) -> Result<permission::Model, AdminError> {
        self.guard.require(admin_id, "manage-permissions").await?;
        AuthorizationGuard::validate_permission_name(name)?;
        let name = name.to_lowercase();

        let existing = self.permission_store.find_by_id(permission_id).await?;
        self.refuse_if_protected_permission(admin_id, &existing.name, context).await?;
        if name != existing.name {
            self.refuse_if_protected_permission(admin_id, &name, context).await?;
        }

        let permission = self
            .permission_store
            .update(permission_id, name, description)
            .await?;
        audit_logger::log_admin_mutation(
            &self.audit_store,
            EventType::PermissionUpdated,
            admin_id,
            &permission.name,
            context,
        )
        .await;

        Ok(permission)
    }

    pub async fn delete_permission(
        &self,
        admin_id: &str,
        permission_id: &str,
        context: &RequestContext,
    ) -> Result<(), AdminError> {
        self.guard.require(admin_id, "manage-permissions").await?;

        let permission = self.permission_store.find_by_id(permission_id).await?;
        self.refuse_if_protected_permission(admin_id, &permission.name, context).await?;

        self.permission_store.delete(permission_id).await?;
        audit_logger::log_admin_mutation(
            &self.audit_store,
            EventType::PermissionDeleted,
            admin_id,
            &permission.name,
            context,
        )
        .await;

        Ok(())
    }

    // ----- users -----

    pub async fn list_users(&self, admin_id: &str) -> Result<Vec<user::Model>, AdminError> {
        self.guard.require(admin_id, "view-users").await?;
        Ok(self.user_store.list().await?)
    }

    pub async fn get_user(&self, admin_id: &str, user_id: &str) -> Result<user::Model, AdminError> {
        self.guard.require(admin_id, "view-users").await?;
        Ok(self.user_store.find_by_id(user_id).await?)
    }

    /// Update a user's profile, account flags and assignments
    ///
    /// Disabling an account signs it out everywhere in the same call.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_user(
        &self,
        admin_id: &str,
        user_id: &str,
        name: &str,
        email: &str,
        disabled: bool,
        force_password_change: bool,
        role_ids: &[String],
        permission_ids: &[String],
        context: &RequestContext,
    ) -> Result<user::Model, AdminError> {
        self.guard.require(admin_id, "edit-users").await?;

        let target = self.user_store.find_by_id(user_id).await?;

        let current_role_ids: Vec<String> = self
            .user_store
            .roles_of(user_id)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        let roles_changing = !same_id_set(&current_role_ids, role_ids);

        self.guard
            .check_user_update(&target, disabled, force_password_change, roles_changing)
            .await?;

        for role_id in role_ids {
            self.role_store.find_by_id(role_id).await?;
        }
        for permission_id in permission_ids {
            self.permission_store.find_by_id(permission_id).await?;
        }

        let updated = self
            .user_store
            .update_account(
                user_id,
                name.to_string(),
                email.to_string(),
                disabled,
                force_password_change,
            )
            .await?;
        self.user_store.sync_roles(user_id, role_ids).await?;
        self.user_store.sync_permissions(user_id, permission_ids).await?;

        if disabled && !target.disabled {
            self.session_registry.terminate_all_for_user(user_id, None).await?;
        }

        audit_logger::log_admin_mutation(
            &self.audit_store,
            EventType::UserUpdated,
            admin_id,
            user_id,
            context,
        )
        .await;

        Ok(updated)
    }

    /// Soft-delete a user and sign them out everywhere
    pub async fn delete_user(
        &self,
        admin_id: &str,
        user_id: &str,
        context: &RequestContext,
    ) -> Result<(), AdminError> {
        self.guard.require(admin_id, "delete-users").await?;

        self.user_store.find_by_id(user_id).await?;
        if self.guard.has_role(user_id, SUPERUSER_ROLE).await? {
            return Err(AdminError::superuser_immutable());
        }

        self.user_store.soft_delete(user_id).await?;
        self.session_registry.terminate_all_for_user(user_id, None).await?;

        audit_logger::log_admin_mutation(
            &self.audit_store,
            EventType::UserDeleted,
            admin_id,
            user_id,
            context,
        )
        .await;

        Ok(())
    }

    // ----- sessions -----

    /// Sessions of any user, for the admin sessions screen
    ///
    /// `requester_session_id` lets the screen mark the admin's own
    /// session when they inspect themselves.
    pub async fn list_user_sessions(
        &self,
        admin_id: &str,
        user_id: &str,
        requester_session_id: &str,
    ) -> Result<Vec<SessionView>, AdminError> {
        self.guard.require(admin_id, "view-sessions").await?;
        self.user_store.find_by_id(user_id).await?;
        Ok(self
            .session_registry
            .list(user_id, requester_session_id)
            .await?)
    }

    /// Terminate one session of any user
    pub async fn terminate_user_session(
        &self,
        admin_id: &str,
        user_id: &str,
        session_id: &str,
        requester_session_id: &str,
        context: &RequestContext,
    ) -> Result<(), AdminError> {
        self.guard.require(admin_id, "view-sessions").await?;
        self.user_store.find_by_id(user_id).await?;

        self.session_registry
            .terminate(user_id, requester_session_id, session_id, context)
            .await?;
        Ok(())
    }

    /// Terminate every session a user has, without a password check
    ///
    /// The requester's own session survives when they target themselves;
    /// for any other user the exclusion matches nothing.
    pub async fn terminate_user_sessions(
        &self,
        admin_id: &str,
        user_id: &str,
        requester_session_id: &str,
        context: &RequestContext,
    ) -> Result<u64, AdminError> {
        self.guard.require(admin_id, "view-sessions").await?;
        self.user_store.find_by_id(user_id).await?;

        let terminated = self
            .session_registry
            .terminate_all_for_user(user_id, Some(requester_session_id))
            .await?;

        audit_logger::log_admin_mutation(
            &self.audit_store,
            EventType::SessionsBulkTerminated,
            admin_id,
            user_id,
            context,
        )
        .await;

        Ok(terminated)
    }

    // ----- settings -----

    pub async fn get_settings(&self, admin_id: &str) -> Result<setting::Model, AdminError> {
        self.require_superuser(admin_id).await?;
        Ok(self.settings_store.get().await?)
    }

    /// Toggle passwordless login; the in-process cache is invalidated
    /// here, on the only path that changes the stored value
    pub async fn set_passwordless_login(
        &self,
        admin_id: &str,
        enabled: bool,
        context: &RequestContext,
    ) -> Result<setting::Model, AdminError> {
        self.require_superuser(admin_id).await?;

        let settings = self.settings_store.set_passwordless_login(enabled).await?;
        self.passwordless.invalidate();

        audit_logger::log_admin_mutation(
            &self.audit_store,
            EventType::SettingsChanged,
            admin_id,
            &format!("passwordless_login={enabled}"),
            context,
        )
        .await;

        Ok(settings)
    }

    pub async fn set_password_expiry(
        &self,
        admin_id: &str,
        enabled: bool,
        context: &RequestContext,
    ) -> Result<setting::Model, AdminError> {
        self.require_superuser(admin_id).await?;

        let settings = self.settings_store.set_password_expiry(enabled).await?;

        audit_logger::log_admin_mutation(
            &self.audit_store,
            EventType::SettingsChanged,
            admin_id,
            &format!("password_expiry={enabled}"),
            context,
        )
        .await;

        Ok(settings)
    }

    // ----- helpers -----

    /// Global toggles are reserved for superusers, not a grantable permission
    async fn require_superuser(&self, admin_id: &str) -> Result<(), AdminError> {
        if self.guard.has_role(admin_id, SUPERUSER_ROLE).await? {
            Ok(())
        } else {
            Err(AdminError::permission_denied("superuser"))
        }
    }

    async fn refuse_if_protected_role(
        &self,
        admin_id: &str,
        name: &str,
        context: &RequestContext,
    ) -> Result<(), AdminError> {
        if self.guard.is_protected_role(name) {
            audit_logger::log_protected_refusal(&self.audit_store, admin_id, "role", name, context)
                .await;
            return Err(AdminError::protected_entity("role", name));
        }
        Ok(())
    }

    async fn refuse_if_protected_permission(
        &self,
        admin_id: &str,
        name: &str,
        context: &RequestContext,
    ) -> Result<(), AdminError> {
        if self.guard.is_protected_permission(name) {
            audit_logger::log_protected_refusal(
                &self.audit_store,
                admin_id,
                "permission",
                name,
                context,
            )
            .await;
            return Err(AdminError::protected_entity("permission", name));
        }
        Ok(())
    }
}

fn same_id_set(current: &[String], proposed: &[String]) -> bool {
    use std::collections::HashSet;
    let current: HashSet<&str> = current.iter().map(String::as_str).collect();
    let proposed: HashSet<&str> = proposed.iter().map(String::as_str).collect();
    current == proposed
}

impl std::fmt::Debug for AdminService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminService").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::clock::SystemClock;
    use crate::services::token_store::TokenStore;
    use crate::stores::SessionStore;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    struct Fixture {
        service: AdminService,
        user_store: Arc<UserStore>,
        role_store: Arc<RoleStore>,
        permission_store: Arc<PermissionStore>,
        session_registry: Arc<SessionRegistry>,
    }

    async fn setup() -> Fixture {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        let clock = Arc::new(SystemClock);
        let user_store = Arc::new(UserStore::new(db.clone()));
        let role_store = Arc::new(RoleStore::new(db.clone()));
        let permission_store = Arc::new(PermissionStore::new(db.clone()));
        let settings_store = Arc::new(SettingsStore::new(db.clone()));
        settings_store.ensure_defaults().await.unwrap();
        let audit_store = Arc::new(AuditStore::new(db.clone()));
        let token_store = Arc::new(TokenStore::new(clock.clone()));
        let session_registry = Arc::new(SessionRegistry::new(
            Arc::new(SessionStore::new(db)),
            user_store.clone(),
            token_store,
            audit_store.clone(),
            clock,
        ));
        let guard = Arc::new(AuthorizationGuard::new(
            user_store.clone(),
            vec!["superuser".to_string(), "user".to_string()],
            vec!["manage-roles".to_string(), "edit-users".to_string()],
        ));
        let passwordless = Arc::new(PasswordlessFlag::new(settings_store.clone()));

        let service = AdminService::new(
            role_store.clone(),
            permission_store.clone(),
            user_store.clone(),
            settings_store,
            audit_store,
            session_registry.clone(),
            guard,
            passwordless,
        );

        Fixture {
            service,
            user_store,
            role_store,
            permission_store,
            session_registry,
        }
    }

    /// Seed a user holding the superuser role, which passes every check
    async fn seed_superuser(fixture: &Fixture) -> user::Model {
        let user = fixture
            .user_store
            .create_user("Root".to_string(), "root@example.com".to_string(), None, true)
            .await
            .unwrap();
        let role = fixture
            .role_store
            .create("superuser".to_string(), None)
            .await
            .unwrap();
        fixture
            .user_store
            .sync_roles(&user.id, &[role.id])
            .await
            .unwrap();
        user
    }

    #[tokio::test]
    async fn test_protected_role_cannot_be_created_or_deleted() {
        let fixture = setup().await;
        let admin = seed_superuser(&fixture).await;
        let context = RequestContext::default();

        let result = fixture
            .service
            .create_role(&admin.id, "user", None, &context)
            .await;
        assert!(matches!(result, Err(AdminError::ProtectedEntity(_))));

        // The seeded superuser role itself cannot be deleted
        let superuser_role = fixture
            .role_store
            .find_by_name("superuser")
            .await
            .unwrap()
            .unwrap();
        let result = fixture
            .service
            .delete_role(&admin.id, &superuser_role.id, &context)
            .await;
        assert!(matches!(result, Err(AdminError::ProtectedEntity(_))));
    }

    #[tokio::test]
    async fn test_rename_onto_protected_name_refused() {
        let fixture = setup().await;
        let admin = seed_superuser(&fixture).await;
        let context = RequestContext::default();

        let role = fixture
            .service
            .create_role(&admin.id, "editors", None, &context)
            .await
            .unwrap();

        let result = fixture
            .service
            .update_role(&admin.id, &role.id, "superuser", None, &[], &context)
            .await;
        assert!(matches!(result, Err(AdminError::ProtectedEntity(_))));
    }

    #[tokio::test]
    async fn test_non_admin_cannot_manage_roles() {
        let fixture = setup().await;
        let user = fixture
            .user_store
            .create_user("Eve".to_string(), "eve@example.com".to_string(), None, true)
            .await
            .unwrap();

        let result = fixture
            .service
            .create_role(&user.id, "editors", None, &RequestContext::default())
            .await;
        assert!(matches!(result, Err(AdminError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_disabling_user_terminates_sessions() {
        let fixture = setup().await;
        let admin = seed_superuser(&fixture).await;
        let context = RequestContext::default();

        let target = fixture
            .user_store
            .create_user("Bob".to_string(), "bob@example.com".to_string(), None, true)
            .await
            .unwrap();
        fixture
            .session_registry
            .create_session(&target.id, &context)
            .await
            .unwrap();

        fixture
            .service
            .update_user(
                &admin.id,
                &target.id,
                "Bob",
                "bob@example.com",
                true,
                false,
                &[],
                &[],
                &context,
            )
            .await
            .unwrap();

        let views = fixture
            .session_registry
            .list(&target.id, "none")
            .await
            .unwrap();
        assert!(views.is_empty());
    }

    #[tokio::test]
    async fn test_admin_terminates_another_users_sessions() {
        let fixture = setup().await;
        let admin = seed_superuser(&fixture).await;
        let context = RequestContext::default();

        let admin_session = fixture
            .session_registry
            .create_session(&admin.id, &context)
            .await
            .unwrap();
        let target = fixture
            .user_store
            .create_user("Bob".to_string(), "bob@example.com".to_string(), None, true)
            .await
            .unwrap();
        for _ in 0..2 {
            fixture
                .session_registry
                .create_session(&target.id, &context)
                .await
                .unwrap();
        }

        let views = fixture
            .service
            .list_user_sessions(&admin.id, &target.id, &admin_session.id)
            .await
            .unwrap();
        assert_eq!(views.len(), 2);
        assert!(views.iter().all(|v| !v.is_current));

        let first = views[0].session.id.clone();
        fixture
            .service
            .terminate_user_session(&admin.id, &target.id, &first, &admin_session.id, &context)
            .await
            .unwrap();

        let terminated = fixture
            .service
            .terminate_user_sessions(&admin.id, &target.id, &admin_session.id, &context)
            .await
            .unwrap();
        assert_eq!(terminated, 1);

        let views = fixture
            .service
            .list_user_sessions(&admin.id, &target.id, &admin_session.id)
            .await
            .unwrap();
        assert!(views.is_empty());
    }

    #[tokio::test]
    async fn test_admin_bulk_terminate_spares_own_session() {
        let fixture = setup().await;
        let admin = seed_superuser(&fixture).await;
        let context = RequestContext::default();

        let current = fixture
            .session_registry
            .create_session(&admin.id, &context)
            .await
            .unwrap();
        fixture
            .session_registry
            .create_session(&admin.id, &context)
            .await
            .unwrap();

        let terminated = fixture
            .service
            .terminate_user_sessions(&admin.id, &admin.id, &current.id, &context)
            .await
            .unwrap();
        assert_eq!(terminated, 1);

        let views = fixture
            .service
            .list_user_sessions(&admin.id, &admin.id, &current.id)
            .await
            .unwrap();
        assert_eq!(views.len(), 1);
        assert!(views[0].is_current);
    }

    #[tokio::test]
    async fn test_session_administration_requires_permission() {
        let fixture = setup().await;
        let user = fixture
            .user_store
            .create_user("Eve".to_string(), "eve@example.com".to_string(), None, true)
            .await
            .unwrap();

        let result = fixture
            .service
            .list_user_sessions(&user.id, &user.id, "none")
            .await;
        assert!(matches!(result, Err(AdminError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_superuser_cannot_be_deleted() {
        let fixture = setup().await;
        let admin = seed_superuser(&fixture).await;

        let result = fixture
            .service
            .delete_user(&admin.id, &admin.id, &RequestContext::default())
            .await;
        assert!(matches!(result, Err(AdminError::SuperuserImmutable(_))));
    }

    #[tokio::test]
    async fn test_conflicting_flags_refused() {
        let fixture = setup().await;
        let admin = seed_superuser(&fixture).await;
        let context = RequestContext::default();

        let target = fixture
            .user_store
            .create_user("Bob".to_string(), "bob@example.com".to_string(), None, true)
            .await
            .unwrap();

        let result = fixture
            .service
            .update_user(
                &admin.id,
                &target.id,
                "Bob",
                "bob@example.com",
                true,
                true,
                &[],
                &[],
                &context,
            )
            .await;
        assert!(matches!(result, Err(AdminError::ConflictingFlags(_))));
    }

    #[tokio::test]
    async fn test_protected_permission_refused_and_audited() {
        let fixture = setup().await;
        let admin = seed_superuser(&fixture).await;
        let context = RequestContext::default();

        let result = fixture
            .service
            .create_permission(&admin.id, "manage-roles", None, &context)
            .await;
        assert!(matches!(result, Err(AdminError::ProtectedEntity(_))));

        // Ordinary permission names go through
        let created = fixture
            .service
            .create_permission(&admin.id, "publish-posts", None, &context)
            .await
            .unwrap();
        assert_eq!(created.name, "publish-posts");
        assert!(fixture
            .permission_store
            .find_by_name("publish-posts")
            .await
            .unwrap()
            .is_some());
    }
}
