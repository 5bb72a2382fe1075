use poem_openapi::Object;

use crate::types::db::user;

/// Request body for magic-link registration
#[derive(Object, Debug)]
pub struct RegisterRequest {
    /// Display name
    pub name: String,

    /// Email address the login link is sent to
    pub email: String,
}

/// Request body for requesting a login link
#[derive(Object, Debug)]
pub struct LoginRequest {
    pub email: String,
}

/// Generic acknowledgement for endpoints with nothing else to return
#[derive(Object, Debug)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A user as returned by the API; no credential material
#[derive(Object, Debug)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub email_verified: bool,
    pub disabled: bool,
    pub force_password_change: bool,
    /// Unix timestamp after which the password is expired, if one is set
    pub password_expires_at: Option<i64>,
    /// Whole days until the password expires; absent when no expiry
    /// applies. Drives the "password expires in N days" banner.
    pub password_expires_in_days: Option<i64>,
    pub created_at: i64,
}

impl UserResponse {
    pub fn with_expiry_days(mut self, days: Option<i64>) -> Self {
        self.password_expires_in_days = days;
        self
    }
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            email_verified: model.email_verified_at.is_some(),
            disabled: model.disabled,
            force_password_change: model.force_password_change,
            password_expires_at: model.password_expires_at,
            password_expires_in_days: None,
            created_at: model.created_at,
        }
    }
}

/// Successful redemption of a login link
#[derive(Object, Debug)]
pub struct AuthenticateResponse {
    /// Bearer credential for subsequent requests
    pub session_id: String,
    pub user: UserResponse,
}

/// Request body for the forced / expired password-change flow
#[derive(Object, Debug)]
pub struct ChangePasswordRequest {
    /// Current password; required when the account has one
    pub current_password: Option<String>,
    pub new_password: String,
}
