// Persistence layer: one store per aggregate, all backed by sea-orm
pub mod audit_store;
pub mod permission_store;
pub mod role_store;
pub mod session_store;
pub mod settings_store;
pub mod user_store;

pub use audit_store::AuditStore;
pub use permission_store::PermissionStore;
pub use role_store::RoleStore;
pub use session_store::SessionStore;
pub use settings_store::SettingsStore;
pub use user_store::UserStore;
