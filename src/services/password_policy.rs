use std::sync::Arc;

use chrono::{DateTime, Months, TimeZone, Utc};

use crate::config::settings::RateWindow;
use crate::errors::{AuthError, InternalError};
use crate::services::audit_logger;
use crate::services::clock::Clock;
use crate::services::crypto;
use crate::services::rate_limiter::RateLimiter;
use crate::stores::{AuditStore, SettingsStore, UserStore};
use crate::types::db::user;
use crate::types::internal::context::RequestContext;

/// Which gate sent the user into the password-change flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFlow {
    /// An admin set `force_password_change` on the account
    Forced,
    /// The account's password passed its expiry date
    Expired,
}

impl ChangeFlow {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Forced => "forced",
            Self::Expired => "expired",
        }
    }
}

/// Enforces password expiry and complexity policy
///
/// The expiry gate runs on every authenticated request; the change path
/// is rate limited per user, not per IP, so a forced-change loop cannot
/// be brute-forced from rotating addresses.
pub struct PasswordPolicyEngine {
    user_store: Arc<UserStore>,
    settings_store: Arc<SettingsStore>,
    audit_store: Arc<AuditStore>,
    rate_limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
    change_window: RateWindow,
}

impl PasswordPolicyEngine {
    pub fn new(
        user_store: Arc<UserStore>,
        settings_store: Arc<SettingsStore>,
        audit_store: Arc<AuditStore>,
        rate_limiter: Arc<RateLimiter>,
        clock: Arc<dyn Clock>,
        change_window: RateWindow,
    ) -> Self {
        Self {
            user_store,
            settings_store,
            audit_store,
            rate_limiter,
            clock,
            change_window,
        }
    }

    /// Whether the user's password is past its expiry date
    ///
    /// Accounts without a password or without an expiry date never expire.
    pub fn is_expired(&self, user: &user::Model) -> bool {
        match (user.password_hash.as_ref(), user.password_expires_at) {
            (Some(_), Some(expires_at)) => self.clock.now_timestamp() >= expires_at,
            _ => false,
        }
    }

    /// Whole days until expiry, or None when no expiry applies
    pub fn days_remaining(&self, user: &user::Model) -> Option<i64> {
        user.password_hash.as_ref()?;
        let expires_at = user.password_expires_at?;
        let remaining = expires_at - self.clock.now_timestamp();
        Some(remaining.max(0) / 86_400)
    }

    /// Gate an authenticated request on password state
    ///
    /// Forced change is checked before expiry; the expiry check only
    /// applies while the global password-expiry toggle is on.
    pub async fn gate(&self, user: &user::Model) -> Result<(), AuthError> {
        if user.force_password_change {
            return Err(AuthError::password_change_required());
        }

        let settings = self.settings_store.get().await?;
        if settings.password_expiry && self.is_expired(user) {
            return Err(AuthError::password_expired());
        }

        Ok(())
    }

    /// Validate password complexity: at least 8 characters with upper
    /// and lower case letters, a digit and a symbol
    pub fn validate_complexity(password: &str) -> Result<(), AuthError> {
        if password.chars().count() < 8 {
            return Err(AuthError::password_policy_violation(
                "The password must be at least 8 characters.",
            ));
        }
        if !password.chars().any(|c| c.is_uppercase())
            || !password.chars().any(|c| c.is_lowercase())
        {
            return Err(AuthError::password_policy_violation(
                "The password must contain both uppercase and lowercase letters.",
            ));
        }
        if !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(AuthError::password_policy_violation(
                "The password must contain at least one number.",
            ));
        }
        if password.chars().all(|c| c.is_alphanumeric()) {
            return Err(AuthError::password_policy_violation(
                "The password must contain at least one symbol.",
            ));
        }
        Ok(())
    }

    /// Change the user's password as part of a forced or expired flow
    ///
    /// Verifies the current password (when one exists), enforces
    /// complexity and the same-password rule, then clears the flag that
    /// triggered the flow. The expired flow pushes the expiry date three
    /// months past now; the forced flow leaves the expiry date alone.
    pub async fn change_password(
        &self,
        user_id: &str,
        current_password: Option<&str>,
        new_password: &str,
        flow: ChangeFlow,
        context: &RequestContext,
    ) -> Result<user::Model, AuthError> {
        let rate_key = format!("user.password.change:{user_id}");
        if let Err(retry_after) = self.rate_limiter.hit(&rate_key, self.change_window) {
            return Err(AuthError::rate_limited(retry_after));
        }

        let user = self.user_store.find_by_id(user_id).await?;

        if let Some(stored_hash) = &user.password_hash {
            let Some(current) = current_password else {
                return Err(AuthError::invalid_credentials());
            };
            if !crypto::verify_password(current, stored_hash)? {
                return Err(AuthError::invalid_credentials());
            }
            if crypto::verify_password(new_password, stored_hash)? {
                return Err(AuthError::same_password());
            }
        }

        Self::validate_complexity(new_password)?;

        let new_expiry = match flow {
            ChangeFlow::Expired => Some(self.expiry_from_now()?),
            ChangeFlow::Forced => None,
        };
        let new_hash = crypto::hash_password(new_password)?;

        let updated = self
            .user_store
            .set_password(user_id, new_hash, new_expiry, flow == ChangeFlow::Forced)
            .await?;

        self.rate_limiter.clear(&rate_key);
        audit_logger::log_password_changed(&self.audit_store, user_id, flow.as_str(), context)
            .await;

        Ok(updated)
    }

    /// Timestamp three calendar months from now
    fn expiry_from_now(&self) -> Result<i64, InternalError> {
        let now: DateTime<Utc> = Utc
            .timestamp_opt(self.clock.now_timestamp(), 0)
            .single()
            .ok_or_else(|| InternalError::parse("timestamp", "clock out of range"))?;

        let expiry = now
            .checked_add_months(Months::new(3))
            .ok_or_else(|| InternalError::parse("timestamp", "expiry out of range"))?;

        Ok(expiry.timestamp())
    }
}

impl std::fmt::Debug for PasswordPolicyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordPolicyEngine")
            .field("change_window", &self.change_window)
            .finish()
    }
}
