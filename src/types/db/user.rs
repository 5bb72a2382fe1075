use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,

    // Null for passwordless-only accounts
    pub password_hash: Option<String>,
    pub email_verified_at: Option<i64>,

    // Password lifecycle
    pub password_changed_at: Option<i64>,
    pub password_expires_at: Option<i64>,
    pub force_password_change: bool,

    pub disabled: bool,

    pub created_at: i64,
    pub updated_at: i64,

    // Soft delete; rows are retained for audit
    pub deleted_at: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
