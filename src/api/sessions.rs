use poem::Request;
use poem_openapi::param::Path;
use poem_openapi::payload::Json;
use poem_openapi::OpenApi;

use crate::api::{authenticate_request, request_context, SessionAuth};
use crate::app_data::AppData;
use crate::errors::AuthError;
use crate::types::dto::auth::MessageResponse;
use crate::types::dto::session::{
    SessionListResponse, TerminateOthersRequest, TerminateOthersResponse,
};

/// The caller's signed-in devices
pub struct SessionsApi {
    data: AppData,
}

impl SessionsApi {
    pub fn new(data: AppData) -> Self {
        Self { data }
    }
}

#[OpenApi(prefix_path = "/sessions")]
impl SessionsApi {
    /// List sessions, most recently active first
    #[oai(path = "/", method = "get")]
    async fn list(&self, auth: SessionAuth) -> Result<Json<SessionListResponse>, AuthError> {
        let (user, session) = authenticate_request(&self.data, &auth).await?;

        let views = self.data.session_registry.list(&user.id, &session.id).await?;
        Ok(Json(SessionListResponse {
            sessions: views.into_iter().map(Into::into).collect(),
        }))
    }

    /// Terminate one other session
    #[oai(path = "/:session_id", method = "delete")]
    async fn terminate(
        &self,
        req: &Request,
        auth: SessionAuth,
        session_id: Path<String>,
    ) -> Result<Json<MessageResponse>, AuthError> {
        let context = request_context(req);
        let (user, session) = authenticate_request(&self.data, &auth).await?;

        self.data
            .session_registry
            .terminate(&user.id, &session.id, &session_id.0, &context)
            .await?;

        Ok(Json(MessageResponse::new("Session terminated.")))
    }

    /// Terminate every session except this one; requires the password
    #[oai(path = "/terminate-others", method = "post")]
    async fn terminate_others(
        &self,
        req: &Request,
        auth: SessionAuth,
        body: Json<TerminateOthersRequest>,
    ) -> Result<Json<TerminateOthersResponse>, AuthError> {
        let context = request_context(req);
        let (user, session) = authenticate_request(&self.data, &auth).await?;

        let terminated_count = self
            .data
            .session_registry
            .terminate_others(&user.id, &session.id, &body.password, &context)
            .await?;

        Ok(Json(TerminateOthersResponse { terminated_count }))
    }
}
