use std::collections::HashMap;
use std::fmt;

/// Event types for security audit logging
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    UserRegistered,
    MagicLinkIssued,
    MagicLinkDenied,
    LoginSuccess,
    LoginFailure,
    SessionTerminated,
    SessionsBulkTerminated,
    PasswordChanged,
    RoleCreated,
    RoleUpdated,
    RoleDeleted,
    PermissionCreated,
    PermissionUpdated,
    PermissionDeleted,
    ProtectedEntityRefusal,
    UserUpdated,
    UserDeleted,
    SettingsChanged,
    Custom(String),
}

impl EventType {
    /// Convert EventType to string representation for database storage
    pub fn as_str(&self) -> &str {
        match self {
            Self::UserRegistered => "user_registered",
            Self::MagicLinkIssued => "magic_link_issued",
            Self::MagicLinkDenied => "magic_link_denied",
            Self::LoginSuccess => "login_success",
            Self::LoginFailure => "login_failure",
            Self::SessionTerminated => "session_terminated",
            Self::SessionsBulkTerminated => "sessions_bulk_terminated",
            Self::PasswordChanged => "password_changed",
            Self::RoleCreated => "role_created",
            Self::RoleUpdated => "role_updated",
            Self::RoleDeleted => "role_deleted",
            Self::PermissionCreated => "permission_created",
            Self::PermissionUpdated => "permission_updated",
            Self::PermissionDeleted => "permission_deleted",
            Self::ProtectedEntityRefusal => "protected_entity_refusal",
            Self::UserUpdated => "user_updated",
            Self::UserDeleted => "user_deleted",
            Self::SettingsChanged => "settings_changed",
            Self::Custom(s) => s.as_str(),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Audit event structure for building and storing audit logs
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub event_type: EventType,
    pub user_id: Option<String>,
    pub ip_address: Option<String>,
    pub data: HashMap<String, serde_json::Value>,
}

impl AuditEvent {
    /// Create a new audit event with the specified event type
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            user_id: None,
            ip_address: None,
            data: HashMap::new(),
        }
    }
}
