use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::errors::internal::InternalError;
use crate::types::db::session::{self, ActiveModel, Entity as Session};

/// SessionStore persists server-side sessions, one row per signed-in device
pub struct SessionStore {
    db: DatabaseConnection,
}

impl SessionStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Insert a new session row
    pub async fn insert(
        &self,
        session_id: String,
        user_id: String,
        user_agent: Option<String>,
        ip_address: Option<String>,
        now: i64,
    ) -> Result<session::Model, InternalError> {
        let row = ActiveModel {
            id: Set(session_id),
            user_id: Set(user_id),
            user_agent: Set(user_agent),
            ip_address: Set(ip_address),
            last_activity: Set(now),
            created_at: Set(now),
        };

        row.insert(&self.db)
            .await
            .map_err(|e| InternalError::database("insert_session", e))
    }

    pub async fn find_by_id(
        &self,
        session_id: &str,
    ) -> Result<Option<session::Model>, InternalError> {
        Session::find_by_id(session_id)
            .one(&self.db)
            .await
            .map_err(|e| InternalError::database("find_session_by_id", e))
    }

    /// Sessions for one user, most recently active first
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<session::Model>, InternalError> {
        Session::find()
            .filter(session::Column::UserId.eq(user_id))
            .order_by_desc(session::Column::LastActivity)
            .all(&self.db)
            .await
            .map_err(|e| InternalError::database("list_sessions", e))
    }

    /// Bump a session's last-activity timestamp
    pub async fn touch(&self, session_id: &str, now: i64) -> Result<(), InternalError> {
        let Some(session) = self.find_by_id(session_id).await? else {
            return Ok(());
        };

        let mut active: ActiveModel = session.into();
        active.last_activity = Set(now);

        active
            .update(&self.db)
            .await
            .map_err(|e| InternalError::database("touch_session", e))?;

        Ok(())
    }

    /// Delete one of the user's sessions; scoping by user id means a
    /// session id belonging to someone else deletes nothing.
    ///
    /// Returns the number of rows deleted (0 or 1).
    pub async fn delete_by_id(&self, user_id: &str, session_id: &str) -> Result<u64, InternalError> {
        let result = Session::delete_many()
            .filter(session::Column::UserId.eq(user_id))
            .filter(session::Column::Id.eq(session_id))
            .exec(&self.db)
            .await
            .map_err(|e| InternalError::database("delete_session", e))?;

        Ok(result.rows_affected)
    }

    /// Delete all of the user's sessions except the one given
    ///
    /// Returns the number of rows deleted.
    pub async fn delete_all_except(
        &self,
        user_id: &str,
        keep_session_id: &str,
    ) -> Result<u64, InternalError> {
        let result = Session::delete_many()
            .filter(session::Column::UserId.eq(user_id))
            .filter(session::Column::Id.ne(keep_session_id))
            .exec(&self.db)
            .await
            .map_err(|e| InternalError::database("delete_other_sessions", e))?;

        Ok(result.rows_affected)
    }

    /// Delete every session the user has (account disabled or removed)
    pub async fn delete_all_for_user(&self, user_id: &str) -> Result<u64, InternalError> {
        let result = Session::delete_many()
            .filter(session::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await
            .map_err(|e| InternalError::database("delete_all_sessions", e))?;

        Ok(result.rows_affected)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("db", &"<connection>")
            .finish()
    }
}
