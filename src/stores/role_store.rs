use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::errors::internal::{AccessStoreError, InternalError};
use crate::types::db::permission::{self, Entity as Permission};
use crate::types::db::role::{self, ActiveModel, Entity as Role};
use crate::types::db::role_permission::{self, Entity as RolePermission};

/// RoleStore manages named roles and their permission grants
pub struct RoleStore {
    db: DatabaseConnection,
}

impl RoleStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a new role
    ///
    /// # Errors
    /// Returns `AccessStoreError::DuplicateName` if the name is taken
    pub async fn create(
        &self,
        name: String,
        description: Option<String>,
    ) -> Result<role::Model, InternalError> {
        if self.find_by_name(&name).await?.is_some() {
            return Err(AccessStoreError::DuplicateName(name).into());
        }

        let new_role = ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            name: Set(name),
            description: Set(description),
            created_at: Set(Utc::now().timestamp()),
        };

        new_role
            .insert(&self.db)
            .await
            .map_err(|e| InternalError::database("insert_role", e))
    }

    pub async fn find_by_id(&self, role_id: &str) -> Result<role::Model, InternalError> {
        Role::find_by_id(role_id)
            .one(&self.db)
            .await
            .map_err(|e| InternalError::database("find_role_by_id", e))?
            .ok_or_else(|| AccessStoreError::RoleNotFound(role_id.to_string()).into())
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<role::Model>, InternalError> {
        Role::find()
            .filter(role::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(|e| InternalError::database("find_role_by_name", e))
    }

    pub async fn list(&self) -> Result<Vec<role::Model>, InternalError> {
        Role::find()
            .order_by_asc(role::Column::Name)
            .all(&self.db)
            .await
            .map_err(|e| InternalError::database("list_roles", e))
    }

    /// Rename a role and update its description
    pub async fn update(
        &self,
        role_id: &str,
        name: String,
        description: Option<String>,
    ) -> Result<role::Model, InternalError> {
        let role = self.find_by_id(role_id).await?;

        if role.name != name && self.find_by_name(&name).await?.is_some() {
            return Err(AccessStoreError::DuplicateName(name).into());
        }

        let mut active: ActiveModel = role.into();
        active.name = Set(name);
        active.description = Set(description);

        active
            .update(&self.db)
            .await
            .map_err(|e| InternalError::database("update_role", e))
    }

    /// Delete a role; its assignments and grants cascade
    pub async fn delete(&self, role_id: &str) -> Result<(), InternalError> {
        let role = self.find_by_id(role_id).await?;

        role.delete(&self.db)
            .await
            .map_err(|e| InternalError::database("delete_role", e))?;

        Ok(())
    }

    /// Replace the role's permission grants with exactly `permission_ids`
    pub async fn sync_permissions(
        &self,
        role_id: &str,
        permission_ids: &[String],
    ) -> Result<(), InternalError> {
        use sea_orm::TransactionTrait;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| InternalError::transaction("sync_role_permissions", e))?;

        RolePermission::delete_many()
            .filter(role_permission::Column::RoleId.eq(role_id))
            .exec(&txn)
            .await
            .map_err(|e| InternalError::database("clear_role_permissions", e))?;

        for permission_id in permission_ids {
            let link = role_permission::ActiveModel {
                role_id: Set(role_id.to_string()),
                permission_id: Set(permission_id.clone()),
            };
            link.insert(&txn)
                .await
                .map_err(|e| InternalError::database("insert_role_permission", e))?;
        }

        txn.commit()
            .await
            .map_err(|e| InternalError::transaction("sync_role_permissions_commit", e))?;

        Ok(())
    }

    /// Permissions granted to the role
    pub async fn permissions_of(
        &self,
        role_id: &str,
    ) -> Result<Vec<permission::Model>, InternalError> {
        let links = RolePermission::find()
            .filter(role_permission::Column::RoleId.eq(role_id))
            .all(&self.db)
            .await
            .map_err(|e| InternalError::database("find_role_permissions", e))?;

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
}

impl std::fmt::Debug for RoleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleStore")
            .field("db", &"<connection>")
            .finish()
    }
}
