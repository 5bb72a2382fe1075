use poem_openapi::{payload::Json, ApiResponse, Object};
use std::fmt;

use crate::errors::internal::{InternalError, UserStoreError};

/// Standardized error response for authentication and session endpoints
#[derive(Object, Debug)]
pub struct AuthErrorResponse {
    /// Error code identifier
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code
    pub status_code: u16,

    /// Seconds until the caller may retry (rate limiting only)
    pub retry_after_seconds: Option<i64>,

    /// Field the error relates to (validation only)
    pub field: Option<String>,
}

impl AuthErrorResponse {
    fn new(error: &str, message: String, status_code: u16) -> Self {
        Self {
            error: error.to_string(),
            message,
            status_code,
            retry_after_seconds: None,
            field: None,
        }
    }
}

/// Authentication, session and password-policy error types
#[derive(ApiResponse, Debug)]
pub enum AuthError {
    /// Malformed input (bad email, empty name, weak password format)
    #[oai(status = 422)]
    ValidationError(Json<AuthErrorResponse>),

    /// Too many attempts in the current window; includes retry-after
    #[oai(status = 429)]
    RateLimited(Json<AuthErrorResponse>),

    /// No account matches the supplied email
    #[oai(status = 404)]
    UserNotFound(Json<AuthErrorResponse>),

    /// Signed URL failed signature or URL-level expiry verification
    #[oai(status = 401)]
    InvalidSignature(Json<AuthErrorResponse>),

    /// Magic token absent, already consumed, or past its TTL
    #[oai(status = 401)]
    ExpiredOrInvalidToken(Json<AuthErrorResponse>),

    /// Passwordless login is globally disabled; surfaced as not-found
    #[oai(status = 404)]
    FeatureDisabled(Json<AuthErrorResponse>),

    /// Password verification failed
    #[oai(status = 401)]
    InvalidCredentials(Json<AuthErrorResponse>),

    /// No valid session presented
    #[oai(status = 401)]
    Unauthenticated(Json<AuthErrorResponse>),

    /// Account is disabled
    #[oai(status = 403)]
    AccountDisabled(Json<AuthErrorResponse>),

    /// Caller must complete the forced password-change flow first
    #[oai(status = 409)]
    PasswordChangeRequired(Json<AuthErrorResponse>),

    /// Password has expired; caller must change it before continuing
    #[oai(status = 409)]
    PasswordExpired(Json<AuthErrorResponse>),

    /// New password matches the current one
    #[oai(status = 422)]
    SamePassword(Json<AuthErrorResponse>),

    /// New password fails complexity rules
    #[oai(status = 422)]
    PasswordPolicyViolation(Json<AuthErrorResponse>),

    /// A session cannot terminate itself
    #[oai(status = 422)]
    CannotTerminateCurrentSession(Json<AuthErrorResponse>),

    /// Session not found for this user
    #[oai(status = 404)]
    SessionNotFound(Json<AuthErrorResponse>),

    /// Internal server error
    #[oai(status = 500)]
    InternalError(Json<AuthErrorResponse>),
}

impl AuthError {
    /// Create a ValidationError for a specific field
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        let mut response = AuthErrorResponse::new("validation_error", message.into(), 422);
        response.field = Some(field.to_string());
        AuthError::ValidationError(Json(response))
    }

    /// Create a RateLimited error carrying the retry-after window
    pub fn rate_limited(retry_after_seconds: i64) -> Self {
        let mut response = AuthErrorResponse::new(
            "rate_limited",
            format!(
                "Too many attempts. Please try again in {} seconds.",
                retry_after_seconds
            ),
            429,
        );
        response.retry_after_seconds = Some(retry_after_seconds);
        AuthError::RateLimited(Json(response))
    }

    /// Create a UserNotFound error
    pub fn user_not_found() -> Self {
        AuthError::UserNotFound(Json(AuthErrorResponse::new(
            "user_not_found",
            "We could not find a user with that email address.".to_string(),
            404,
        )))
    }

    /// Create an InvalidSignature error
    pub fn invalid_signature() -> Self {
        AuthError::InvalidSignature(Json(AuthErrorResponse::new(
            "invalid_signature",
            "This login link is invalid or has expired. Please request a new one.".to_string(),
            401,
        )))
    }

    /// Create an ExpiredOrInvalidToken error
    pub fn expired_or_invalid_token() -> Self {
        AuthError::ExpiredOrInvalidToken(Json(AuthErrorResponse::new(
            "expired_or_invalid_token",
            "This login link has expired or is invalid. Please request a new one.".to_string(),
            401,
        )))
    }

    /// Create a FeatureDisabled error (404-equivalent by design)
    pub fn feature_disabled() -> Self {
        AuthError::FeatureDisabled(Json(AuthErrorResponse::new(
            "not_found",
            "Not found.".to_string(),
            404,
        )))
    }

    /// Create an InvalidCredentials error
    pub fn invalid_credentials() -> Self {
        AuthError::InvalidCredentials(Json(AuthErrorResponse::new(
            "invalid_credentials",
            "The provided password is incorrect.".to_string(),
            401,
        )))
    }

    /// Create an Unauthenticated error
    pub fn unauthenticated() -> Self {
        AuthError::Unauthenticated(Json(AuthErrorResponse::new(
            "unauthenticated",
            "A valid session is required.".to_string(),
            401,
        )))
    }

    /// Create an AccountDisabled error
    pub fn account_disabled() -> Self {
        AuthError::AccountDisabled(Json(AuthErrorResponse::new(
            "account_disabled",
            "Account disabled. Contact support for help.".to_string(),
            403,
        )))
    }

    /// Create a PasswordChangeRequired error
    pub fn password_change_required() -> Self {
        AuthError::PasswordChangeRequired(Json(AuthErrorResponse::new(
            "password_change_required",
            "You must change your password before continuing.".to_string(),
            409,
        )))
    }

    /// Create a PasswordExpired error
    pub fn password_expired() -> Self {
        AuthError::PasswordExpired(Json(AuthErrorResponse::new(
            "password_expired",
            "Your password has expired. Please change it to continue.".to_string(),
            409,
        )))
    }

    /// Create a SamePassword error
    pub fn same_password() -> Self {
        AuthError::SamePassword(Json(AuthErrorResponse::new(
            "same_password",
            "Your new password cannot be the same as your current password.".to_string(),
            422,
        )))
    }

    /// Create a PasswordPolicyViolation error
    pub fn password_policy_violation(message: impl Into<String>) -> Self {
        AuthError::PasswordPolicyViolation(Json(AuthErrorResponse::new(
            "password_policy_violation",
            message.into(),
            422,
        )))
    }

    /// Create a CannotTerminateCurrentSession error
    pub fn cannot_terminate_current_session() -> Self {
        AuthError::CannotTerminateCurrentSession(Json(AuthErrorResponse::new(
            "cannot_terminate_current_session",
            "Cannot terminate current session.".to_string(),
            422,
        )))
    }

    /// Create a SessionNotFound error
    pub fn session_not_found() -> Self {
        AuthError::SessionNotFound(Json(AuthErrorResponse::new(
            "session_not_found",
            "Session not found.".to_string(),
            404,
        )))
    }

    /// Create an InternalError
    pub fn internal_error(message: String) -> Self {
        AuthError::InternalError(Json(AuthErrorResponse::new(
            "internal_error",
            message,
            500,
        )))
    }

    /// Get the error message from the error variant
    pub fn message(&self) -> String {
        match self {
            AuthError::ValidationError(json) => json.0.message.clone(),
            AuthError::RateLimited(json) => json.0.message.clone(),
            AuthError::UserNotFound(json) => json.0.message.clone(),
            AuthError::InvalidSignature(json) => json.0.message.clone(),
            AuthError::ExpiredOrInvalidToken(json) => json.0.message.clone(),
            AuthError::FeatureDisabled(json) => json.0.message.clone(),
            AuthError::InvalidCredentials(json) => json.0.message.clone(),
            AuthError::Unauthenticated(json) => json.0.message.clone(),
            AuthError::AccountDisabled(json) => json.0.message.clone(),
            AuthError::PasswordChangeRequired(json) => json.0.message.clone(),
            AuthError::PasswordExpired(json) => json.0.message.clone(),
            AuthError::SamePassword(json) => json.0.message.clone(),
            AuthError::PasswordPolicyViolation(json) => json.0.message.clone(),
            AuthError::CannotTerminateCurrentSession(json) => json.0.message.clone(),
            AuthError::SessionNotFound(json) => json.0.message.clone(),
            AuthError::InternalError(json) => json.0.message.clone(),
        }
    }

    /// Get the retry-after window, if any (RateLimited only)
    pub fn retry_after_seconds(&self) -> Option<i64> {
        match self {
            AuthError::RateLimited(json) => json.0.retry_after_seconds,
            _ => None,
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl From<InternalError> for AuthError {
    fn from(err: InternalError) -> Self {
        match err {
            InternalError::User(UserStoreError::UserNotFound(_)) => AuthError::user_not_found(),
            InternalError::User(UserStoreError::DuplicateEmail(_)) => {
                AuthError::validation("email", "The email has already been taken.")
            }
            other => AuthError::internal_error(other.to_string()),
        }
    }
}
