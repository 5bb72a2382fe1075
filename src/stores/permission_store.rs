use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::errors::internal::{AccessStoreError, InternalError};
use crate::types::db::permission::{self, ActiveModel, Entity as Permission};

/// PermissionStore manages named permissions
pub struct PermissionStore {
    db: DatabaseConnection,
}

impl PermissionStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a new permission
    ///
    /// # Errors
    /// Returns `AccessStoreError::DuplicateName` if the name is taken
    pub async fn create(
        &self,
        name: String,
        description: Option<String>,
    ) -> Result<permission::Model, InternalError> {
        if self.find_by_name(&name).await?.is_some() {
            return Err(AccessStoreError::DuplicateName(name).into());
        }

        let new_permission = ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            name: Set(name),
            description: Set(description),
            created_at: Set(Utc::now().timestamp()),
        };

        new_permission
            .insert(&self.db)
            .await
            .map_err(|e| InternalError::database("insert_permission", e))
    }

    pub async fn find_by_id(&self, permission_id: &str) -> Result<permission::Model, InternalError> {
        Permission::find_by_id(permission_id)
            .one(&self.db)
            .await
            .map_err(|e| InternalError::database("find_permission_by_id", e))?
            .ok_or_else(|| AccessStoreError::PermissionNotFound(permission_id.to_string()).into())
    }

    pub async fn find_by_name(
        &self,
        name: &str,
    ) -> Result<Option<permission::Model>, InternalError> {
        Permission::find()
            .filter(permission::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(|e| InternalError::database("find_permission_by_name", e))
    }

    pub async fn list(&self) -> Result<Vec<permission::Model>, InternalError> {
        Permission::find()
            .order_by_asc(permission::Column::Name)
            .all(&self.db)
            .await
            .map_err(|e| InternalError::database("list_permissions", e))
    }

    /// Rename a permission and update its description
    pub async fn update(
        &self,
        permission_id: &str,
        name: String,
        description: Option<String>,
    ) -> Result<permission::Model, InternalError> {
        let permission = self.find_by_id(permission_id).await?;

        if permission.name != name && self.find_by_name(&name).await?.is_some() {
            return Err(AccessStoreError::DuplicateName(name).into());
        }

        let mut active: ActiveModel = permission.into();
        active.name = Set(name);
        active.description = Set(description);

        active
            .update(&self.db)
            .await
            .map_err(|e| InternalError::database("update_permission", e))
    }

    /// Delete a permission; role grants and direct grants cascade
    pub async fn delete(&self, permission_id: &str) -> Result<(), InternalError> {
        let permission = self.find_by_id(permission_id).await?;

        permission
            .delete(&self.db)
            .await
            .map_err(|e| InternalError::database("delete_permission", e))?;

        Ok(())
    }
}

impl std::fmt::Debug for PermissionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionStore")
            .field("db", &"<connection>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn setup_test_store() -> PermissionStore {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");

        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        PermissionStore::new(db)
    }

    #[tokio::test]
    async fn test_create_and_list_sorted_by_name() {
        let store = setup_test_store().await;

        store
            .create("view-users".to_string(), None)
            .await
            .unwrap();
        store
            .create("edit-users".to_string(), None)
            .await
            .unwrap();

        let permissions = store.list().await.unwrap();
        assert_eq!(permissions.len(), 2);
        assert_eq!(permissions[0].name, "edit-users");
        assert_eq!(permissions[1].name, "view-users");
    }

    #[tokio::test]
    async fn test_rename_to_taken_name_fails() {
        let store = setup_test_store().await;

        store.create("view-users".to_string(), None).await.unwrap();
        let other = store.create("edit-users".to_string(), None).await.unwrap();

        let result = store
            .update(&other.id, "view-users".to_string(), None)
            .await;
        assert!(matches!(
            result,
            Err(InternalError::Access(AccessStoreError::DuplicateName(_)))
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_permission_fails() {
        let store = setup_test_store().await;

        let result = store.delete("does-not-exist").await;
        assert!(matches!(
            result,
            Err(InternalError::Access(AccessStoreError::PermissionNotFound(_)))
        ));
    }
}
