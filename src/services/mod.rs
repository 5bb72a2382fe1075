// Service layer: orchestrates stores, enforces policy, emits audit events
pub mod admin_service;
pub mod audit_logger;
pub mod authorization;
pub mod clock;
pub mod crypto;
pub mod link_signer;
pub mod magic_link;
pub mod mailer;
pub mod password_policy;
pub mod rate_limiter;
pub mod session_registry;
pub mod token_store;

pub use admin_service::AdminService;
pub use authorization::AuthorizationGuard;
pub use clock::{Clock, SystemClock};
pub use link_signer::LinkSigner;
pub use magic_link::MagicLinkService;
pub use mailer::{LoginLinkMailer, RecordingMailer, TracingMailer};
pub use password_policy::{ChangeFlow, PasswordPolicyEngine};
pub use rate_limiter::RateLimiter;
pub use session_registry::{SessionRegistry, SessionView};
pub use token_store::{TokenPayload, TokenStore};
