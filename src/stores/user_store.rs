use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::errors::internal::{InternalError, UserStoreError};
use crate::types::db::permission::{self, Entity as Permission};
use crate::types::db::role::{self, Entity as Role};
use crate::types::db::role_permission::{self, Entity as RolePermission};
use crate::types::db::user::{self, ActiveModel, Entity as User};
use crate::types::db::user_permission::{self, Entity as UserPermission};
use crate::types::db::user_role::{self, Entity as UserRole};

/// UserStore manages user accounts, their role/permission assignments and
/// the soft-delete lifecycle
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    /// Create a new UserStore with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a new user account
    ///
    /// # Arguments
    /// * `name` - Display name
    /// * `email` - Unique email address
    /// * `password_hash` - Pre-hashed password, or None for passwordless accounts
    /// * `email_verified` - Whether the email is pre-verified (magic-link registration)
    ///
    /// # Errors
    /// Returns `UserStoreError::DuplicateEmail` if the email is already registered
    pub async fn create_user(
        &self,
        name: String,
        email: String,
        password_hash: Option<String>,
        email_verified: bool,
    ) -> Result<user::Model, InternalError> {
        let existing = User::find()
            .filter(user::Column::Email.eq(&email))
            .one(&self.db)
            .await
            .map_err(|e| InternalError::database("find_user_by_email", e))?;

        if existing.is_some() {
            return Err(UserStoreError::DuplicateEmail(email).into());
        }

        let now = Utc::now().timestamp();
        let new_user = ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            name: Set(name),
            email: Set(email.clone()),
            password_hash: Set(password_hash),
            email_verified_at: Set(email_verified.then_some(now)),
            password_changed_at: Set(None),
            password_expires_at: Set(None),
            force_password_change: Set(false),
            disabled: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        };

        let model = new_user.insert(&self.db).await.map_err(|e| {
            // Unique index race: two registrations for the same email
            if e.to_string().contains("UNIQUE") {
                InternalError::from(UserStoreError::DuplicateEmail(email))
            } else {
                InternalError::database("insert_user", e)
            }
        })?;

        Ok(model)
    }

    /// Find a live (not soft-deleted) user by id
    pub async fn find_by_id(&self, user_id: &str) -> Result<user::Model, InternalError> {
        User::find_by_id(user_id)
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .map_err(|e| InternalError::database("find_user_by_id", e))?
            .ok_or_else(|| UserStoreError::UserNotFound(user_id.to_string()).into())
    }

    /// Find a live user by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, InternalError> {
        User::find()
            .filter(user::Column::Email.eq(email))
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .map_err(|e| InternalError::database("find_user_by_email", e))
    }

    /// List live users, newest first
    pub async fn list(&self) -> Result<Vec<user::Model>, InternalError> {
        use sea_orm::QueryOrder;

        User::find()
            .filter(user::Column::DeletedAt.is_null())
            .order_by_desc(user::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| InternalError::database("list_users", e))
    }

    /// Update profile and account-status fields
    ///
    /// Policy checks (superuser immutability, conflicting flags) happen in
    /// the service layer before this is called; the store persists what it
    /// is given.
    pub async fn update_account(
        &self,
        user_id: &str,
        name: String,
        email: String,
        disabled: bool,
        force_password_change: bool,
    ) -> Result<user::Model, InternalError> {
        let user = self.find_by_id(user_id).await?;

        if user.email != email {
            let taken = User::find()
                .filter(user::Column::Email.eq(&email))
                .filter(user::Column::Id.ne(user_id))
                .one(&self.db)
                .await
                .map_err(|e| InternalError::database("check_email_unique", e))?;
            if taken.is_some() {
                return Err(UserStoreError::DuplicateEmail(email).into());
            }
        }

        let mut active: ActiveModel = user.into();
        active.name = Set(name);
        active.email = Set(email);
        active.disabled = Set(disabled);
        active.force_password_change = Set(force_password_change);
        active.updated_at = Set(Utc::now().timestamp());

        active
            .update(&self.db)
            .await
            .map_err(|e| InternalError::database("update_user_account", e))
    }

    /// Record a successful password change
    ///
    /// # Arguments
    /// * `password_hash` - New Argon2 hash
    /// * `new_expiry` - New `password_expires_at`, or None to leave unchanged
    /// * `clear_force_flag` - Clear `force_password_change` (forced-change flow)
    pub async fn set_password(
        &self,
        user_id: &str,
        password_hash: String,
        new_expiry: Option<i64>,
        clear_force_flag: bool,
    ) -> Result<user::Model, InternalError> {
        let user = self.find_by_id(user_id).await?;
        let now = Utc::now().timestamp();

        let mut active: ActiveModel = user.into();
        active.password_hash = Set(Some(password_hash));
        active.password_changed_at = Set(Some(now));
        if let Some(expiry) = new_expiry {
            active.password_expires_at = Set(Some(expiry));
        }
        if clear_force_flag {
            active.force_password_change = Set(false);
        }
        active.updated_at = Set(now);

        active
            .update(&self.db)
            .await
            .map_err(|e| InternalError::database("set_password", e))
    }

    /// Soft-delete a user; the row is retained for audit
    pub async fn soft_delete(&self, user_id: &str) -> Result<(), InternalError> {
        let user = self.find_by_id(user_id).await?;
        let now = Utc::now().timestamp();

        let mut active: ActiveModel = user.into();
        active.deleted_at = Set(Some(now));
        active.updated_at = Set(now);

        active
            .update(&self.db)
            .await
            .map_err(|e| InternalError::database("soft_delete_user", e))?;

        Ok(())
    }

    /// Replace the user's role assignments with exactly `role_ids`
    pub async fn sync_roles(&self, user_id: &str, role_ids: &[String]) -> Result<(), InternalError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| InternalError::transaction("sync_roles", e))?;

        UserRole::delete_many()
            .filter(user_role::Column::UserId.eq(user_id))
            .exec(&txn)
            .await
            .map_err(|e| InternalError::database("clear_user_roles", e))?;

        for role_id in role_ids {
            let link = user_role::ActiveModel {
                user_id: Set(user_id.to_string()),
                role_id: Set(role_id.clone()),
            };
            link.insert(&txn)
                .await
                .map_err(|e| InternalError::database("insert_user_role", e))?;
        }

        txn.commit()
            .await
            .map_err(|e| InternalError::transaction("sync_roles_commit", e))?;

        Ok(())
    }

    /// Replace the user's direct permission grants with exactly `permission_ids`
    pub async fn sync_permissions(
        &self,
        user_id: &str,
        permission_ids: &[String],
    ) -> Result<(), InternalError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| InternalError::transaction("sync_permissions", e))?;

        UserPermission::delete_many()
            .filter(user_permission::Column::UserId.eq(user_id))
            .exec(&txn)
            .await
            .map_err(|e| InternalError::database("clear_user_permissions", e))?;

        for permission_id in permission_ids {
            let link = user_permission::ActiveModel {
                user_id: Set(user_id.to_string()),
                permission_id: Set(permission_id.clone()),
            };
            link.insert(&txn)
                .await
                .map_err(|e| InternalError::database("insert_user_permission", e))?;
        }

        txn.commit()
            .await
            .map_err(|e| InternalError::transaction("sync_permissions_commit", e))?;

        Ok(())
    }

    /// Roles currently assigned to the user
    pub async fn roles_of(&self, user_id: &str) -> Result<Vec<role::Model>, InternalError> {
        let links = UserRole::find()
            .filter(user_role::Column::UserId.eq(user_id))
            .all(&self.db)
            .await
            .map_err(|e| InternalError::database("find_user_roles", e))?;

        let role_ids: Vec<String> = links.into_iter().map(|l| l.role_id).collect();
        if role_ids.is_empty() {
            return Ok(vec![]);
        }

        Role::find()
            .filter(role::Column::Id.is_in(role_ids))
            .all(&self.db)
            .await
            .map_err(|e| InternalError::database("find_roles_by_ids", e))
    }

    /// Permissions granted directly to the user (not via roles)
    pub async fn direct_permissions_of(
        &self,
        user_id: &str,
    ) -> Result<Vec<permission::Model>, InternalError> {
        let links = UserPermission::find()
            .filter(user_permission::Column::UserId.eq(user_id))
            .all(&self.db)
            .await
            .map_err(|e| InternalError::database("find_user_permissions", e))?;

        let permission_ids: Vec<String> = links.into_iter().map(|l| l.permission_id).collect();
        if permission_ids.is_empty() {
            return Ok(vec![]);
        }

        Permission::find()
            .filter(permission::Column::Id.is_in(permission_ids))
            .all(&self.db)
            .await
            .map_err(|e| InternalError::database("find_permissions_by_ids", e))
    }

    /// Union of permission names from all the user's roles plus direct grants
    pub async fn effective_permission_names(
        &self,
        user_id: &str,
    ) -> Result<std::collections::HashSet<String>, InternalError> {
        let mut names: std::collections::HashSet<String> = self
            .direct_permissions_of(user_id)
            .await?
            .into_iter()
            .map(|p| p.name)
            .collect();

        let roles = self.roles_of(user_id).await?;
        let role_ids: Vec<String> = roles.into_iter().map(|r| r.id).collect();
        if role_ids.is_empty() {
            return Ok(names);
        }

        let links = RolePermission::find()
            .filter(role_permission::Column::RoleId.is_in(role_ids))
            .all(&self.db)
            .await
            .map_err(|e| InternalError::database("find_role_permissions", e))?;

        let permission_ids: Vec<String> = links.into_iter().map(|l| l.permission_id).collect();
        if permission_ids.is_empty() {
            return Ok(names);
        }

        let role_permissions = Permission::find()
            .filter(permission::Column::Id.is_in(permission_ids))
            .all(&self.db)
            .await
            .map_err(|e| InternalError::database("find_permissions_by_ids", e))?;

        names.extend(role_permissions.into_iter().map(|p| p.name));
        Ok(names)
    }
}

impl std::fmt::Debug for UserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserStore")
            .field("db", &"<connection>")
            .finish()
    }
}
