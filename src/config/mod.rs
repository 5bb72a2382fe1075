// Configuration: env-derived settings, logging setup, cached feature flags
pub mod feature_flags;
pub mod logging;
pub mod settings;

pub use feature_flags::PasswordlessFlag;
pub use settings::{AppSettings, RateLimitSettings, RateWindow};
