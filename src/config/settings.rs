use std::env;

/// Per-action rate-limit window: at most `max_attempts` hits per
/// `decay_seconds`. Actions keep distinct thresholds by design; no
/// unified policy is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    pub max_attempts: u32,
    pub decay_seconds: i64,
}

/// Rate-limit thresholds for each limited action
#[derive(Debug, Clone, Copy)]
pub struct RateLimitSettings {
    pub registration: RateWindow,
    pub login: RateWindow,
    pub password_change: RateWindow,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            registration: RateWindow {
                max_attempts: 3,
                decay_seconds: 300,
            },
            login: RateWindow {
                max_attempts: 5,
                decay_seconds: 60,
            },
            password_change: RateWindow {
                max_attempts: 3,
                decay_seconds: 120,
            },
        }
    }
}

/// Application settings loaded once at startup
///
/// The app key signs login URLs; changing it invalidates every link in
/// flight. Protected role/permission names are configuration, not data:
/// they cannot be created, renamed or deleted through the admin surface.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub database_url: String,
    pub app_key: String,
    pub base_url: String,
    pub bind_address: String,
    pub rate_limits: RateLimitSettings,
    pub protected_roles: Vec<String>,
    pub protected_permissions: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsLoadError {
    #[error("Missing required environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid value for {variable}: {value}")]
    InvalidValue { variable: String, value: String },
}

const DEFAULT_PROTECTED_ROLES: &[&str] = &["superuser", "user"];

const DEFAULT_PROTECTED_PERMISSIONS: &[&str] = &[
    "view-users",
    "edit-users",
    "delete-users",
    "manage-roles",
    "manage-permissions",
    "view-sessions",
];

impl AppSettings {
    /// Load settings from environment variables
    ///
    /// # Errors
    /// Returns `SettingsLoadError::MissingVariable` if `APP_KEY` is unset;
    /// all other variables have defaults.
    pub fn from_env() -> Result<Self, SettingsLoadError> {
        let app_key = env::var("APP_KEY")
            .map_err(|_| SettingsLoadError::MissingVariable("APP_KEY".to_string()))?;

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://admingate.db?mode=rwc".to_string());

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let bind_address = env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let protected_roles = env_list("PROTECTED_ROLES", DEFAULT_PROTECTED_ROLES);
        let protected_permissions = env_list("PROTECTED_PERMISSIONS", DEFAULT_PROTECTED_PERMISSIONS);

        let rate_limits = RateLimitSettings {
            registration: RateWindow {
                max_attempts: env_parse("RATE_LIMIT_REGISTRATION_MAX", 3)?,
                decay_seconds: env_parse("RATE_LIMIT_REGISTRATION_DECAY", 300)?,
            },
            login: RateWindow {
                max_attempts: env_parse("RATE_LIMIT_LOGIN_MAX", 5)?,
                decay_seconds: env_parse("RATE_LIMIT_LOGIN_DECAY", 60)?,
            },
            password_change: RateWindow {
                max_attempts: env_parse("RATE_LIMIT_PASSWORD_CHANGE_MAX", 3)?,
                decay_seconds: env_parse("RATE_LIMIT_PASSWORD_CHANGE_DECAY", 120)?,
            },
        };

        Ok(Self {
            database_url,
            app_key,
            base_url,
            bind_address,
            rate_limits,
            protected_roles,
            protected_permissions,
        })
    }

    /// Settings suitable for tests: fixed key, in-memory database
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            app_key: "test-app-key-minimum-32-characters-long".to_string(),
            base_url: "http://localhost:3000".to_string(),
            bind_address: "127.0.0.1:0".to_string(),
            rate_limits: RateLimitSettings::default(),
            protected_roles: DEFAULT_PROTECTED_ROLES.iter().map(|s| s.to_string()).collect(),
            protected_permissions: DEFAULT_PROTECTED_PERMISSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

fn env_list(variable: &str, defaults: &[&str]) -> Vec<String> {
    match env::var(variable) {
        Ok(value) => value
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => defaults.iter().map(|s| s.to_string()).collect(),
    }
}

fn env_parse<T: std::str::FromStr>(variable: &str, default: T) -> Result<T, SettingsLoadError> {
    match env::var(variable) {
        Ok(value) => value.parse().map_err(|_| SettingsLoadError::InvalidValue {
            variable: variable.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}
