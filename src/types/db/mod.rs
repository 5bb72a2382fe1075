// Database entity models (sea-orm)
pub mod audit_event;
pub mod permission;
pub mod role;
pub mod role_permission;
pub mod session;
pub mod setting;
pub mod user;
pub mod user_permission;
pub mod user_role;
