use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::errors::{AdminError, InternalError};
use crate::stores::UserStore;
use crate::types::db::user;

pub const SUPERUSER_ROLE: &str = "superuser";

fn role_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z][a-zA-Z0-9 _\-]*$").expect("role name regex is valid")
    })
}

fn permission_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^[a-z]+(?:-[a-z]+)*$").expect("permission name regex is valid")
    })
}

/// Access-control decisions: permission checks, protected-name policy
/// and the account-flag rules admins must not break
///
/// A user's effective permissions are the union of every permission on
/// every role they hold plus their direct grants. The superuser role
/// bypasses permission checks entirely. Protected names are matched
/// exactly and case-sensitively; "Superuser" is an ordinary name.
pub struct AuthorizationGuard {
    user_store: Arc<UserStore>,
    protected_roles: Vec<String>,
    protected_permissions: Vec<String>,
}

impl AuthorizationGuard {
    pub fn new(
        user_store: Arc<UserStore>,
        protected_roles: Vec<String>,
        protected_permissions: Vec<String>,
    ) -> Self {
        Self {
            user_store,
            protected_roles,
            protected_permissions,
        }
    }

    /// Whether the user holds the named role
    pub async fn has_role(&self, user_id: &str, role_name: &str) -> Result<bool, InternalError> {
        let roles = self.user_store.roles_of(user_id).await?;
        Ok(roles.iter().any(|r| r.name == role_name))
    }

    /// Whether the user may perform the action guarded by `permission`
    pub async fn can(&self, user_id: &str, permission: &str) -> Result<bool, InternalError> {
        if self.has_role(user_id, SUPERUSER_ROLE).await? {
            return Ok(true);
        }

        let names = self.user_store.effective_permission_names(user_id).await?;
        Ok(names.contains(permission))
    }

    /// Fail with PermissionDenied unless the user holds `permission`
    pub async fn require(&self, user_id: &str, permission: &str) -> Result<(), AdminError> {
        if self.can(user_id, permission).await? {
            Ok(())
        } else {
            Err(AdminError::permission_denied(permission))
        }
    }

    pub fn is_protected_role(&self, name: &str) -> bool {
        self.protected_roles.iter().any(|n| n == name)
    }

    pub fn is_protected_permission(&self, name: &str) -> bool {
        self.protected_permissions.iter().any(|n| n == name)
    }

    /// Refuse mutation of a protected role name
    pub fn check_role_mutable(&self, name: &str) -> Result<(), AdminError> {
        if self.is_protected_role(name) {
            return Err(AdminError::protected_entity("role", name));
        }
        Ok(())
    }

    /// Refuse mutation of a protected permission name
    pub fn check_permission_mutable(&self, name: &str) -> Result<(), AdminError> {
        if self.is_protected_permission(name) {
            return Err(AdminError::protected_entity("permission", name));
        }
        Ok(())
    }

    /// Role names start with a letter, then letters, digits, spaces,
    /// hyphens or underscores
    pub fn validate_role_name(name: &str) -> Result<(), AdminError> {
        if name.is_empty() || name.chars().count() > 255 || !role_name_regex().is_match(name) {
            return Err(AdminError::invalid_name(
                "Role names must start with a letter and may contain letters, numbers, spaces, hyphens and underscores.",
            ));
        }
        Ok(())
    }

    /// Permission names are hyphen-separated words (e.g. `edit-users`)
    pub fn validate_permission_name(name: &str) -> Result<(), AdminError> {
        if name.is_empty() || name.chars().count() > 255 || !permission_name_regex().is_match(name)
        {
            return Err(AdminError::invalid_name(
                "Permission names must be words separated by single hyphens.",
            ));
        }
        Ok(())
    }

    /// Validate an admin's proposed account-status update
    ///
    /// Superuser accounts cannot be disabled, forced to change password
    /// or re-roled. For everyone else the two flags are mutually
    /// exclusive: a disabled account cannot be in a forced-change flow.
    pub async fn check_user_update(
        &self,
        target: &user::Model,
        disabled: bool,
        force_password_change: bool,
        roles_changing: bool,
    ) -> Result<(), AdminError> {
        if self.has_role(&target.id, SUPERUSER_ROLE).await? {
            let flags_changing =
                disabled != target.disabled || force_password_change != target.force_password_change;
            if flags_changing || roles_changing {
                return Err(AdminError::superuser_immutable());
            }
        }

        if disabled && force_password_change {
            return Err(AdminError::conflicting_flags());
        }

        Ok(())
    }
}

impl std::fmt::Debug for AuthorizationGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationGuard")
            .field("protected_roles", &self.protected_roles)
            .field("protected_permissions", &self.protected_permissions)
            .finish()
    }
}
