// Request/response shapes for the HTTP API
pub mod admin;
pub mod auth;
pub mod session;
