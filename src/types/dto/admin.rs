use poem_openapi::Object;

use crate::types::db::{permission, role, setting};

#[derive(Object, Debug)]
pub struct RoleResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: i64,
}

impl From<role::Model> for RoleResponse {
    fn from(model: role::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            created_at: model.created_at,
        }
    }
}

#[derive(Object, Debug)]
pub struct PermissionResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: i64,
}

impl From<permission::Model> for PermissionResponse {
    fn from(model: permission::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            created_at: model.created_at,
        }
    }
}

#[derive(Object, Debug)]
pub struct CreateRoleRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Object, Debug)]
pub struct UpdateRoleRequest {
    pub name: String,
    pub description: Option<String>,
    /// Full replacement set of permission ids
    pub permission_ids: Vec<String>,
}

#[derive(Object, Debug)]
pub struct CreatePermissionRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Object, Debug)]
pub struct UpdatePermissionRequest {
    pub name: String,
    pub description: Option<String>,
}

/// Full replacement update of a managed user
#[derive(Object, Debug)]
pub struct UpdateUserRequest {
    pub name: String,
    pub email: String,
    pub disabled: bool,
    pub force_password_change: bool,
    pub role_ids: Vec<String>,
    pub permission_ids: Vec<String>,
}

#[derive(Object, Debug)]
pub struct SettingsResponse {
    pub passwordless_login: bool,
    pub password_expiry: bool,
    pub updated_at: i64,
}

impl From<setting::Model> for SettingsResponse {
    fn from(model: setting::Model) -> Self {
        Self {
            passwordless_login: model.passwordless_login,
            password_expiry: model.password_expiry,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Object, Debug)]
pub struct UpdateSettingRequest {
    pub enabled: bool,
}
