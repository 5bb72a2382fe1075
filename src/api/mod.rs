use poem::Request;
use poem_openapi::auth::Bearer;
use poem_openapi::SecurityScheme;

use crate::app_data::AppData;
use crate::errors::AuthError;
use crate::types::db::{session, user};
use crate::types::internal::context::RequestContext;

pub mod admin;
pub mod auth;
pub mod health;
pub mod sessions;

pub use admin::AdminApi;
pub use auth::AuthApi;
pub use health::HealthApi;
pub use sessions::SessionsApi;

/// Bearer scheme carrying the caller's session id
#[derive(SecurityScheme)]
#[oai(ty = "bearer")]
pub struct SessionAuth(pub Bearer);

/// Extract client metadata from the incoming request
pub fn request_context(req: &Request) -> RequestContext {
    let ip_address = req
        .remote_addr()
        .as_socket_addr()
        .map(|addr| addr.ip().to_string());
    let user_agent = req
        .headers()
        .get("user-agent")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    RequestContext::new(ip_address, user_agent)
}

/// Resolve the bearer session and apply the password gates
///
/// The gates run here so every protected endpoint gets them; the
/// password-change endpoint calls `resolve_session` instead, otherwise
/// a user with an expired password could never fix it.
pub async fn authenticate_request(
    data: &AppData,
    auth: &SessionAuth,
) -> Result<(user::Model, session::Model), AuthError> {
    let (user, session) = resolve_session(data, auth).await?;
    data.password_policy.gate(&user).await?;
    Ok((user, session))
}

/// Resolve the bearer session without the password gates
pub async fn resolve_session(
    data: &AppData,
    auth: &SessionAuth,
) -> Result<(user::Model, session::Model), AuthError> {
    let session_id = auth.0.token.as_str();
    if session_id.is_empty() {
        return Err(AuthError::unauthenticated());
    }

    data.session_registry.authenticate(session_id).await
}
