use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};

use crate::errors::internal::{InternalError, SettingsError};
use crate::types::db::setting::{self, ActiveModel, Entity as Setting};

/// Row id of the settings singleton
const SETTINGS_ROW_ID: i32 = 1;

/// SettingsStore manages the single row of global security toggles
pub struct SettingsStore {
    db: DatabaseConnection,
}

impl SettingsStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Insert the singleton row with defaults if it does not exist yet
    ///
    /// Called once at startup so reads can treat a missing row as a bug.
    pub async fn ensure_defaults(&self) -> Result<(), InternalError> {
        let existing = Setting::find_by_id(SETTINGS_ROW_ID)
            .one(&self.db)
            .await
            .map_err(|e| InternalError::database("find_settings", e))?;

        if existing.is_none() {
            let row = ActiveModel {
                id: Set(SETTINGS_ROW_ID),
                passwordless_login: Set(true),
                password_expiry: Set(false),
                updated_at: Set(Utc::now().timestamp()),
            };
            row.insert(&self.db)
                .await
                .map_err(|e| InternalError::database("insert_settings", e))?;
        }

        Ok(())
    }

    /// Fetch the settings row
    pub async fn get(&self) -> Result<setting::Model, InternalError> {
        Setting::find_by_id(SETTINGS_ROW_ID)
            .one(&self.db)
            .await
            .map_err(|e| InternalError::database("find_settings", e))?
            .ok_or_else(|| SettingsError::SettingsNotFound.into())
    }

    /// Set the passwordless-login toggle
    pub async fn set_passwordless_login(&self, enabled: bool) -> Result<setting::Model, InternalError> {
        let current = self.get().await?;

        let mut active: ActiveModel = current.into();
        active.passwordless_login = Set(enabled);
        active.updated_at = Set(Utc::now().timestamp());

        active
            .update(&self.db)
            .await
            .map_err(|e| InternalError::database("update_settings", e))
    }

    /// Set the password-expiry toggle
    pub async fn set_password_expiry(&self, enabled: bool) -> Result<setting::Model, InternalError> {
        let current = self.get().await?;

        let mut active: ActiveModel = current.into();
        active.password_expiry = Set(enabled);
        active.updated_at = Set(Utc::now().timestamp());

        active
            .update(&self.db)
            .await
            .map_err(|e| InternalError::database("update_settings", e))
    }
}

impl std::fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsStore")
            .field("db", &"<connection>")
            .finish()
    }
}
