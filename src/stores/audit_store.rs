use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::errors::internal::{AuditError, InternalError};
use crate::types::db::audit_event::{self, ActiveModel, Entity as AuditEventRow};
use crate::types::internal::audit::AuditEvent;

/// AuditStore persists security-relevant events as an append-only trail
pub struct AuditStore {
    db: DatabaseConnection,
}

impl AuditStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Append one event to the audit trail
    pub async fn write_event(&self, event: AuditEvent) -> Result<(), InternalError> {
        let data = serde_json::to_string(&event.data)
            .map_err(|e| AuditError::LogWriteFailed(e.to_string()))?;

        let row = ActiveModel {
            timestamp: Set(Utc::now().to_rfc3339()),
            event_type: Set(event.event_type.as_str().to_string()),
            // Events with no resolved account (failed lookups, denied
            // requests) are attributed to "anonymous"
            user_id: Set(event.user_id.unwrap_or_else(|| "anonymous".to_string())),
            ip_address: Set(event.ip_address),
            data: Set(data),
            ..Default::default()
        };

        row.insert(&self.db)
            .await
            .map_err(|e| InternalError::database("insert_audit_event", e))?;

        Ok(())
    }

    /// Events recorded for one user, newest first
    pub async fn events_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<audit_event::Model>, InternalError> {
        AuditEventRow::find()
            .filter(audit_event::Column::UserId.eq(user_id))
            .order_by_desc(audit_event::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| InternalError::database("find_audit_events", e))
    }
}

impl std::fmt::Debug for AuditStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditStore")
            .field("db", &"<connection>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::internal::audit::EventType;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn setup_test_store() -> AuditStore {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");

        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        AuditStore::new(db)
    }

    #[tokio::test]
    async fn test_write_event_persists_structured_data() {
        let store = setup_test_store().await;

        let mut event = AuditEvent::new(EventType::LoginSuccess);
        event.user_id = Some("user-1".to_string());
        event.ip_address = Some("10.0.0.1".to_string());
        event
            .data
            .insert("email".to_string(), serde_json::json!("a@example.com"));

        store.write_event(event).await.expect("Failed to write event");

        let events = store.events_for_user("user-1").await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "login_success");
        assert_eq!(events[0].ip_address.as_deref(), Some("10.0.0.1"));
        assert!(events[0].data.contains("a@example.com"));
    }

    #[tokio::test]
    async fn test_events_listed_newest_first() {
        let store = setup_test_store().await;

        for event_type in [EventType::MagicLinkIssued, EventType::LoginSuccess] {
            let mut event = AuditEvent::new(event_type);
            event.user_id = Some("user-1".to_string());
            store.write_event(event).await.unwrap();
        }

        let events = store.events_for_user("user-1").await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "login_success");
        assert_eq!(events[1].event_type, "magic_link_issued");
    }
}
