use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::stores::AuditStore;
use crate::types::internal::audit::{AuditEvent, EventType};
use crate::types::internal::context::RequestContext;

/// Free helpers that build and persist audit events
///
/// Audit writes never fail the calling operation; a failed write is
/// logged and dropped. The trail is best effort by design, the
/// operation it records is not.
async fn write(store: &AuditStore, event: AuditEvent) {
    let event_type = event.event_type.clone();
    if let Err(e) = store.write_event(event).await {
        tracing::error!(event_type = %event_type, error = %e, "Failed to write audit event");
    }
}

fn event(
    event_type: EventType,
    user_id: Option<String>,
    context: &RequestContext,
    data: HashMap<String, Value>,
) -> AuditEvent {
    let mut event = AuditEvent::new(event_type);
    event.user_id = user_id;
    event.ip_address = context.ip_address.clone();
    event.data = data;
    event
}

pub async fn log_user_registered(
    store: &Arc<AuditStore>,
    user_id: &str,
    email: &str,
    context: &RequestContext,
) {
    let data = HashMap::from([("email".to_string(), Value::from(email))]);
    write(store, event(EventType::UserRegistered, Some(user_id.to_string()), context, data)).await;
}

pub async fn log_magic_link_issued(
    store: &Arc<AuditStore>,
    user_id: &str,
    email: &str,
    context: &RequestContext,
) {
    let data = HashMap::from([("email".to_string(), Value::from(email))]);
    write(store, event(EventType::MagicLinkIssued, Some(user_id.to_string()), context, data)).await;
}

/// A magic-link request that was refused (unknown email, rate limited,
/// feature disabled). The email is recorded even when no account matches.
pub async fn log_magic_link_denied(
    store: &Arc<AuditStore>,
    email: &str,
    reason: &str,
    context: &RequestContext,
) {
    let data = HashMap::from([
        ("email".to_string(), Value::from(email)),
        ("reason".to_string(), Value::from(reason)),
    ]);
    write(store, event(EventType::MagicLinkDenied, None, context, data)).await;
}

pub async fn log_login_success(
    store: &Arc<AuditStore>,
    user_id: &str,
    session_id: &str,
    context: &RequestContext,
) {
    let data = HashMap::from([("session_id".to_string(), Value::from(session_id))]);
    write(store, event(EventType::LoginSuccess, Some(user_id.to_string()), context, data)).await;
}

pub async fn log_login_failure(store: &Arc<AuditStore>, reason: &str, context: &RequestContext) {
    let data = HashMap::from([("reason".to_string(), Value::from(reason))]);
    write(store, event(EventType::LoginFailure, None, context, data)).await;
}

pub async fn log_session_terminated(
    store: &Arc<AuditStore>,
    user_id: &str,
    session_id: &str,
    context: &RequestContext,
) {
    let data = HashMap::from([("session_id".to_string(), Value::from(session_id))]);
    write(store, event(EventType::SessionTerminated, Some(user_id.to_string()), context, data))
        .await;
}

pub async fn log_sessions_bulk_terminated(
    store: &Arc<AuditStore>,
    user_id: &str,
    terminated_count: u64,
    context: &RequestContext,
) {
    let data = HashMap::from([("terminated_count".to_string(), Value::from(terminated_count))]);
    write(
        store,
        event(EventType::SessionsBulkTerminated, Some(user_id.to_string()), context, data),
    )
    .await;
}

pub async fn log_password_changed(
    store: &Arc<AuditStore>,
    user_id: &str,
    flow: &str,
    context: &RequestContext,
) {
    let data = HashMap::from([("flow".to_string(), Value::from(flow))]);
    write(store, event(EventType::PasswordChanged, Some(user_id.to_string()), context, data)).await;
}

/// Admin mutations on roles, permissions, users and settings share one
/// shape: acting admin, target, and what changed.
pub async fn log_admin_mutation(
    store: &Arc<AuditStore>,
    event_type: EventType,
    admin_user_id: &str,
    target: &str,
    context: &RequestContext,
) {
    let data = HashMap::from([("target".to_string(), Value::from(target))]);
    write(store, event(event_type, Some(admin_user_id.to_string()), context, data)).await;
}

/// A refused attempt to modify a protected role or permission
pub async fn log_protected_refusal(
    store: &Arc<AuditStore>,
    admin_user_id: &str,
    kind: &str,
    name: &str,
    context: &RequestContext,
) {
    let data = HashMap::from([
        ("kind".to_string(), Value::from(kind)),
        ("name".to_string(), Value::from(name)),
    ]);
    write(
        store,
        event(EventType::ProtectedEntityRefusal, Some(admin_user_id.to_string()), context, data),
    )
    .await;
}
