use poem::Request;
use poem_openapi::param::Query;
use poem_openapi::payload::Json;
use poem_openapi::OpenApi;

use crate::api::{authenticate_request, request_context, resolve_session, SessionAuth};
use crate::app_data::AppData;
use crate::errors::AuthError;
use crate::services::ChangeFlow;
use crate::types::dto::auth::{
    AuthenticateResponse, ChangePasswordRequest, LoginRequest, MessageResponse, RegisterRequest,
    UserResponse,
};

/// Passwordless authentication and the password-change flow
pub struct AuthApi {
    data: AppData,
}

impl AuthApi {
    pub fn new(data: AppData) -> Self {
        Self { data }
    }
}

#[OpenApi(prefix_path = "/auth")]
impl AuthApi {
    /// Register a new account; a login link is emailed on success
    #[oai(path = "/magic/register", method = "post")]
    async fn register(
        &self,
        req: &Request,
        body: Json<RegisterRequest>,
    ) -> Result<Json<MessageResponse>, AuthError> {
        let context = request_context(req);
        self.data
            .magic_link
            .register(&body.name, &body.email, &context)
            .await?;

        Ok(Json(MessageResponse::new(
            "Account created. Check your email for a login link.",
        )))
    }

    /// Request a login link for an existing account
    #[oai(path = "/magic/login", method = "post")]
    async fn login(
        &self,
        req: &Request,
        body: Json<LoginRequest>,
    ) -> Result<Json<MessageResponse>, AuthError> {
        let context = request_context(req);
        self.data.magic_link.request_login(&body.email, &context).await?;

        Ok(Json(MessageResponse::new(
            "Login link sent. Check your email.",
        )))
    }

    /// Redeem a signed login link for a session
    #[oai(path = "/magic/authenticate", method = "get")]
    async fn authenticate(
        &self,
        req: &Request,
        token: Query<String>,
        expires: Query<i64>,
        signature: Query<String>,
    ) -> Result<Json<AuthenticateResponse>, AuthError> {
        let context = request_context(req);
        let (user, session) = self
            .data
            .magic_link
            .authenticate(&token.0, expires.0, &signature.0, &context)
            .await?;

        Ok(Json(AuthenticateResponse {
            session_id: session.id,
            user: user.into(),
        }))
    }

    /// The caller's own account
    #[oai(path = "/me", method = "get")]
    async fn me(&self, auth: SessionAuth) -> Result<Json<UserResponse>, AuthError> {
        let (user, _) = authenticate_request(&self.data, &auth).await?;
        let days = self.data.password_policy.days_remaining(&user);
        Ok(Json(UserResponse::from(user).with_expiry_days(days)))
    }

    /// Change the account password (forced-change and expired flows)
    ///
    /// Deliberately skips the password gates; this is the endpoint
    /// a gated user is sent to.
    #[oai(path = "/password", method = "put")]
    async fn change_password(
        &self,
        req: &Request,
        auth: SessionAuth,
        body: Json<ChangePasswordRequest>,
    ) -> Result<Json<UserResponse>, AuthError> {
        let context = request_context(req);
        let (user, _) = resolve_session(&self.data, &auth).await?;

        let flow = if user.force_password_change {
            ChangeFlow::Forced
        } else {
            ChangeFlow::Expired
        };

        let updated = self
            .data
            .password_policy
            .change_password(
                &user.id,
                body.current_password.as_deref(),
                &body.new_password,
                flow,
                &context,
            )
            .await?;

        let days = self.data.password_policy.days_remaining(&updated);
        Ok(Json(UserResponse::from(updated).with_expiry_days(days)))
    }

    /// Sign out the calling session
    #[oai(path = "/logout", method = "post")]
    async fn logout(&self, auth: SessionAuth) -> Result<Json<MessageResponse>, AuthError> {
        let (user, session) = resolve_session(&self.data, &auth).await?;
        self.data.session_registry.sign_out(&user.id, &session.id).await?;

        Ok(Json(MessageResponse::new("Signed out.")))
    }
}
