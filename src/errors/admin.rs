use poem_openapi::{payload::Json, ApiResponse, Object};
use std::fmt;

use crate::errors::internal::{AccessStoreError, InternalError, UserStoreError};

/// Standardized error response for admin endpoints
#[derive(Object, Debug)]
pub struct AdminErrorResponse {
    /// Error code identifier
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code
    pub status_code: u16,
}

/// Admin operation error types (role, permission and user management)
#[derive(ApiResponse, Debug)]
pub enum AdminError {
    /// No valid session presented
    #[oai(status = 401)]
    Unauthorized(Json<AdminErrorResponse>),

    /// Caller is blocked by a password gate and must change it first
    #[oai(status = 409)]
    PasswordGate(Json<AdminErrorResponse>),

    /// Role or permission name is protected by system policy
    #[oai(status = 403)]
    ProtectedEntity(Json<AdminErrorResponse>),

    /// Superuser account status and role cannot be modified
    #[oai(status = 403)]
    SuperuserImmutable(Json<AdminErrorResponse>),

    /// Caller lacks the required permission
    #[oai(status = 403)]
    PermissionDenied(Json<AdminErrorResponse>),

    /// disabled and force_password_change are mutually exclusive
    #[oai(status = 422)]
    ConflictingFlags(Json<AdminErrorResponse>),

    /// Name fails the role/permission naming rules
    #[oai(status = 422)]
    InvalidName(Json<AdminErrorResponse>),

    /// The requester's own session cannot be terminated this way
    #[oai(status = 422)]
    CurrentSession(Json<AdminErrorResponse>),

    /// Role or permission name already taken
    #[oai(status = 409)]
    DuplicateName(Json<AdminErrorResponse>),

    /// Target role, permission or user not found
    #[oai(status = 404)]
    NotFound(Json<AdminErrorResponse>),

    /// Internal server error
    #[oai(status = 500)]
    InternalError(Json<AdminErrorResponse>),
}

impl AdminError {
    /// Create an Unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        AdminError::Unauthorized(Json(AdminErrorResponse {
            error: "unauthorized".to_string(),
            message: message.into(),
            status_code: 401,
        }))
    }

    /// Create a PasswordGate error
    pub fn password_gate(message: impl Into<String>) -> Self {
        AdminError::PasswordGate(Json(AdminErrorResponse {
            error: "password_gate".to_string(),
            message: message.into(),
            status_code: 409,
        }))
    }

    /// Create a ProtectedEntity error
    pub fn protected_entity(kind: &str, name: &str) -> Self {
        AdminError::ProtectedEntity(Json(AdminErrorResponse {
            error: "protected_entity".to_string(),
            message: format!("Cannot modify system {}: {}", kind, name),
            status_code: 403,
        }))
    }

    /// Create a SuperuserImmutable error
    pub fn superuser_immutable() -> Self {
        AdminError::SuperuserImmutable(Json(AdminErrorResponse {
            error: "superuser_immutable".to_string(),
            message: "Superuser account status and role cannot be modified.".to_string(),
            status_code: 403,
        }))
    }

    /// Create a PermissionDenied error
    pub fn permission_denied(permission: &str) -> Self {
        AdminError::PermissionDenied(Json(AdminErrorResponse {
            error: "permission_denied".to_string(),
            message: format!("Missing required permission: {}", permission),
            status_code: 403,
        }))
    }

    /// Create a PermissionDenied error with a verbatim message
    pub fn permission_denied_message(message: impl Into<String>) -> Self {
        AdminError::PermissionDenied(Json(AdminErrorResponse {
            error: "permission_denied".to_string(),
            message: message.into(),
            status_code: 403,
        }))
    }

    /// Create a ConflictingFlags error
    pub fn conflicting_flags() -> Self {
        AdminError::ConflictingFlags(Json(AdminErrorResponse {
            error: "conflicting_flags".to_string(),
            message: "User cannot be both disabled and forced to change password.".to_string(),
            status_code: 422,
        }))
    }

    /// Create an InvalidName error
    pub fn invalid_name(message: impl Into<String>) -> Self {
        AdminError::InvalidName(Json(AdminErrorResponse {
            error: "invalid_name".to_string(),
            message: message.into(),
            status_code: 422,
        }))
    }

    /// Create a CurrentSession error
    pub fn current_session(message: impl Into<String>) -> Self {
        AdminError::CurrentSession(Json(AdminErrorResponse {
            error: "current_session".to_string(),
            message: message.into(),
            status_code: 422,
        }))
    }

    /// Create a DuplicateName error
    pub fn duplicate_name(name: &str) -> Self {
        AdminError::DuplicateName(Json(AdminErrorResponse {
            error: "duplicate_name".to_string(),
            message: format!("The name has already been taken: {}", name),
            status_code: 409,
        }))
    }

    /// Create a NotFound error
    pub fn not_found(kind: &str, id: &str) -> Self {
        AdminError::NotFound(Json(AdminErrorResponse {
            error: "not_found".to_string(),
            message: format!("{} not found: {}", kind, id),
            status_code: 404,
        }))
    }

    /// Create a NotFound error with a verbatim message
    pub fn not_found_message(message: impl Into<String>) -> Self {
        AdminError::NotFound(Json(AdminErrorResponse {
            error: "not_found".to_string(),
            message: message.into(),
            status_code: 404,
        }))
    }

    /// Create an InternalError
    pub fn internal_error(message: String) -> Self {
        AdminError::InternalError(Json(AdminErrorResponse {
            error: "internal_error".to_string(),
            message,
            status_code: 500,
        }))
    }

    /// Get the error message from the error variant
    pub fn message(&self) -> String {
        match self {
            AdminError::Unauthorized(json) => json.0.message.clone(),
            AdminError::PasswordGate(json) => json.0.message.clone(),
            AdminError::ProtectedEntity(json) => json.0.message.clone(),
            AdminError::SuperuserImmutable(json) => json.0.message.clone(),
            AdminError::PermissionDenied(json) => json.0.message.clone(),
            AdminError::ConflictingFlags(json) => json.0.message.clone(),
            AdminError::InvalidName(json) => json.0.message.clone(),
            AdminError::CurrentSession(json) => json.0.message.clone(),
            AdminError::DuplicateName(json) => json.0.message.clone(),
            AdminError::NotFound(json) => json.0.message.clone(),
            AdminError::InternalError(json) => json.0.message.clone(),
        }
    }
}

impl fmt::Display for AdminError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl From<InternalError> for AdminError {
    fn from(err: InternalError) -> Self {
        match err {
            InternalError::Access(AccessStoreError::DuplicateName(name)) => {
                AdminError::duplicate_name(&name)
            }
            InternalError::Access(AccessStoreError::RoleNotFound(id)) => {
                AdminError::not_found("Role", &id)
            }
            InternalError::Access(AccessStoreError::PermissionNotFound(id)) => {
                AdminError::not_found("Permission", &id)
            }
            InternalError::User(UserStoreError::UserNotFound(id)) => {
                AdminError::not_found("User", &id)
            }
            InternalError::User(UserStoreError::DuplicateEmail(email)) => {
                AdminError::duplicate_name(&email)
            }
            other => AdminError::internal_error(other.to_string()),
        }
    }
}

impl From<crate::errors::AuthError> for AdminError {
    fn from(err: crate::errors::AuthError) -> Self {
        use crate::errors::AuthError;

        match &err {
            AuthError::PasswordChangeRequired(_) | AuthError::PasswordExpired(_) => {
                AdminError::password_gate(err.message())
            }
            AuthError::AccountDisabled(_) => AdminError::permission_denied_message(err.message()),
            AuthError::SessionNotFound(_) => AdminError::not_found_message(err.message()),
            AuthError::CannotTerminateCurrentSession(_) => AdminError::current_session(err.message()),
            AuthError::InternalError(_) => AdminError::internal_error(err.message()),
            _ => AdminError::unauthorized(err.message()),
        }
    }
}
