use poem::Request;
use poem_openapi::param::Path;
use poem_openapi::payload::Json;
use poem_openapi::OpenApi;

use crate::api::{authenticate_request, request_context, SessionAuth};
use crate::app_data::AppData;
use crate::errors::AdminError;
use crate::types::db::{session, user};
use crate::types::dto::admin::{
    CreatePermissionRequest, CreateRoleRequest, PermissionResponse, RoleResponse,
    SettingsResponse, UpdatePermissionRequest, UpdateRoleRequest, UpdateSettingRequest,
    UpdateUserRequest,
};
use crate::types::dto::auth::{MessageResponse, UserResponse};
use crate::types::dto::session::{SessionListResponse, TerminateOthersResponse};

/// Role, permission, user and settings administration
pub struct AdminApi {
    data: AppData,
}

impl AdminApi {
    pub fn new(data: AppData) -> Self {
        Self { data }
    }

    async fn admin_user(&self, auth: &SessionAuth) -> Result<user::Model, AdminError> {
        let (user, _) = authenticate_request(&self.data, auth).await?;
        Ok(user)
    }

    async fn admin_caller(
        &self,
        auth: &SessionAuth,
    ) -> Result<(user::Model, session::Model), AdminError> {
        Ok(authenticate_request(&self.data, auth).await?)
    }
}

#[OpenApi(prefix_path = "/admin")]
impl AdminApi {
    // ----- roles -----

    #[oai(path = "/roles", method = "get")]
    async fn list_roles(&self, auth: SessionAuth) -> Result<Json<Vec<RoleResponse>>, AdminError> {
        let admin = self.admin_user(&auth).await?;
        let roles = self.data.admin.list_roles(&admin.id).await?;
        Ok(Json(roles.into_iter().map(Into::into).collect()))
    }

    #[oai(path = "/roles", method = "post")]
    async fn create_role(
        &self,
        req: &Request,
        auth: SessionAuth,
        body: Json<CreateRoleRequest>,
    ) -> Result<Json<RoleResponse>, AdminError> {
        let context = request_context(req);
        let admin = self.admin_user(&auth).await?;

        let role = self
            .data
            .admin
            .create_role(&admin.id, &body.name, body.description.clone(), &context)
            .await?;
        Ok(Json(role.into()))
    }

    #[oai(path = "/roles/:role_id", method = "put")]
    async fn update_role(
        &self,
        req: &Request,
        auth: SessionAuth,
        role_id: Path<String>,
        body: Json<UpdateRoleRequest>,
    ) -> Result<Json<RoleResponse>, AdminError> {
        let context = request_context(req);
        let admin = self.admin_user(&auth).await?;

        let role = self
            .data
            .admin
            .update_role(
                &admin.id,
                &role_id.0,
                &body.name,
                body.description.clone(),
                &body.permission_ids,
                &context,
            )
            .await?;
        Ok(Json(role.into()))
    }

    #[oai(path = "/roles/:role_id", method = "delete")]
    async fn delete_role(
        &self,
        req: &Request,
        auth: SessionAuth,
        role_id: Path<String>,
    ) -> Result<Json<MessageResponse>, AdminError> {
        let context = request_context(req);
        let admin = self.admin_user(&auth).await?;

        self.data.admin.delete_role(&admin.id, &role_id.0, &context).await?;
        Ok(Json(MessageResponse::new("Role deleted.")))
    }

    #[oai(path = "/roles/:role_id/permissions", method = "get")]
    async fn role_permissions(
        &self,
        auth: SessionAuth,
        role_id: Path<String>,
    ) -> Result<Json<Vec<PermissionResponse>>, AdminError> {
        let admin = self.admin_user(&auth).await?;
        let permissions = self.data.admin.role_permissions(&admin.id, &role_id.0).await?;
        Ok(Json(permissions.into_iter().map(Into::into).collect()))
    }

    // ----- permissions -----

    #[oai(path = "/permissions", method = "get")]
    async fn list_permissions(
        &self,
        auth: SessionAuth,
    ) -> Result<Json<Vec<PermissionResponse>>, AdminError> {
        let admin = self.admin_user(&auth).await?;
        let permissions = self.data.admin.list_permissions(&admin.id).await?;
        Ok(Json(permissions.into_iter().map(Into::into).collect()))
    }

    #[oai(path = "/permissions", method = "post")]
    async fn create_permission(
        &self,
        req: &Request,
        auth: SessionAuth,
        body: Json<CreatePermissionRequest>,
    ) -> Result<Json<PermissionResponse>, AdminError> {
        let context = request_context(req);
        let admin = self.admin_user(&auth).await?;

        let permission = self
            .data
            .admin
            .create_permission(&admin.id, &body.name, body.description.clone(), &context)
            .await?;
        Ok(Json(permission.into()))
    }

    #[oai(path = "/permissions/:permission_id", method = "put")]
    async fn update_permission(
        &self,
        req: &Request,
        auth: SessionAuth,
        permission_id: Path<String>,
        body: Json<UpdatePermissionRequest>,
    ) -> Result<Json<PermissionResponse>, AdminError> {
        let context = request_context(req);
        let admin = self.admin_user(&auth).await?;

        let permission = self
            .data
            .admin
            .update_permission(
                &admin.id,
                &permission_id.0,
                &body.name,
                body.description.clone(),
                &context,
            )
            .await?;
        Ok(Json(permission.into()))
    }

    #[oai(path = "/permissions/:permission_id", method = "delete")]
    async fn delete_permission(
        &self,
        req: &Request,
        auth: SessionAuth,
        permission_id: Path<String>,
    ) -> Result<Json<MessageResponse>, AdminError> {
        let context = request_context(req);
        let admin = self.admin_user(&auth).await?;

        self.data
            .admin
            .delete_permission(&admin.id, &permission_id.0, &context)
            .await?;
        Ok(Json(MessageResponse::new("Permission deleted.")))
    }

    // ----- users -----

    #[oai(path = "/users", method = "get")]
    async fn list_users(&self, auth: SessionAuth) -> Result<Json<Vec<UserResponse>>, AdminError> {
        let admin = self.admin_user(&auth).await?;
        let users = self.data.admin.list_users(&admin.id).await?;
        Ok(Json(users.into_iter().map(Into::into).collect()))
    }

    #[oai(path = "/users/:user_id", method = "get")]
    async fn get_user(
        &self,
        auth: SessionAuth,
        user_id: Path<String>,
    ) -> Result<Json<UserResponse>, AdminError> {
        let admin = self.admin_user(&auth).await?;
        let user = self.data.admin.get_user(&admin.id, &user_id.0).await?;
        Ok(Json(user.into()))
    }

    #[oai(path = "/users/:user_id", method = "put")]
    async fn update_user(
        &self,
        req: &Request,
        auth: SessionAuth,
        user_id: Path<String>,
        body: Json<UpdateUserRequest>,
    ) -> Result<Json<UserResponse>, AdminError> {
        let context = request_context(req);
        let admin = self.admin_user(&auth).await?;

        let user = self
            .data
            .admin
            .update_user(
                &admin.id,
                &user_id.0,
                &body.name,
                &body.email,
                body.disabled,
                body.force_password_change,
                &body.role_ids,
                &body.permission_ids,
                &context,
            )
            .await?;
        Ok(Json(user.into()))
    }

    #[oai(path = "/users/:user_id", method = "delete")]
    async fn delete_user(
        &self,
        req: &Request,
        auth: SessionAuth,
        user_id: Path<String>,
    ) -> Result<Json<MessageResponse>, AdminError> {
        let context = request_context(req);
        let admin = self.admin_user(&auth).await?;

        self.data.admin.delete_user(&admin.id, &user_id.0, &context).await?;
        Ok(Json(MessageResponse::new("User deleted.")))
    }

    // ----- sessions -----

    /// Any user's signed-in devices
    #[oai(path = "/users/:user_id/sessions", method = "get")]
    async fn list_user_sessions(
        &self,
        auth: SessionAuth,
        user_id: Path<String>,
    ) -> Result<Json<SessionListResponse>, AdminError> {
        let (admin, session) = self.admin_caller(&auth).await?;

        let views = self
            .data
            .admin
            .list_user_sessions(&admin.id, &user_id.0, &session.id)
            .await?;
        Ok(Json(SessionListResponse {
            sessions: views.into_iter().map(Into::into).collect(),
        }))
    }

    /// Terminate one of a user's sessions
    #[oai(path = "/users/:user_id/sessions/:session_id", method = "delete")]
    async fn terminate_user_session(
        &self,
        req: &Request,
        auth: SessionAuth,
        user_id: Path<String>,
        session_id: Path<String>,
    ) -> Result<Json<MessageResponse>, AdminError> {
        let context = request_context(req);
        let (admin, session) = self.admin_caller(&auth).await?;

        self.data
            .admin
            .terminate_user_session(&admin.id, &user_id.0, &session_id.0, &session.id, &context)
            .await?;
        Ok(Json(MessageResponse::new("Session terminated.")))
    }

    /// Terminate every session a user has; the caller's own session
    /// survives when they target themselves
    #[oai(path = "/users/:user_id/sessions", method = "delete")]
    async fn terminate_user_sessions(
        &self,
        req: &Request,
        auth: SessionAuth,
        user_id: Path<String>,
    ) -> Result<Json<TerminateOthersResponse>, AdminError> {
        let context = request_context(req);
        let (admin, session) = self.admin_caller(&auth).await?;

        let terminated_count = self
            .data
            .admin
            .terminate_user_sessions(&admin.id, &user_id.0, &session.id, &context)
            .await?;
        Ok(Json(TerminateOthersResponse { terminated_count }))
    }

    // ----- settings -----

    #[oai(path = "/settings", method = "get")]
    async fn get_settings(&self, auth: SessionAuth) -> Result<Json<SettingsResponse>, AdminError> {
        let admin = self.admin_user(&auth).await?;
        let settings = self.data.admin.get_settings(&admin.id).await?;
        Ok(Json(settings.into()))
    }

    #[oai(path = "/settings/passwordless-login", method = "put")]
    async fn set_passwordless_login(
        &self,
        req: &Request,
        auth: SessionAuth,
        body: Json<UpdateSettingRequest>,
    ) -> Result<Json<SettingsResponse>, AdminError> {
        let context = request_context(req);
        let admin = self.admin_user(&auth).await?;

        let settings = self
            .data
            .admin
            .set_passwordless_login(&admin.id, body.enabled, &context)
            .await?;
        Ok(Json(settings.into()))
    }

    #[oai(path = "/settings/password-expiry", method = "put")]
    async fn set_password_expiry(
        &self,
        req: &Request,
        auth: SessionAuth,
        body: Json<UpdateSettingRequest>,
    ) -> Result<Json<SettingsResponse>, AdminError> {
        let context = request_context(req);
        let admin = self.admin_user(&auth).await?;

        let settings = self
            .data
            .admin
            .set_password_expiry(&admin.id, body.enabled, &context)
            .await?;
        Ok(Json(settings.into()))
    }
}
