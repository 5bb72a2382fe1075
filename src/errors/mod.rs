// Error types: API-facing (AuthError, AdminError) and store-level (InternalError)
pub mod admin;
pub mod auth;
pub mod internal;

pub use admin::AdminError;
pub use auth::AuthError;
pub use internal::InternalError;
