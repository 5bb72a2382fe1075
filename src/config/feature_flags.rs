use std::sync::{Arc, RwLock};

use crate::errors::InternalError;
use crate::stores::SettingsStore;

/// Cached view of the global passwordless-login toggle
///
/// The flag lives in the settings table but is read on every magic-link
/// request, so it is cached in-process and invalidated explicitly when
/// the settings update path runs (cache-with-explicit-invalidation, not
/// ad hoc global state).
pub struct PasswordlessFlag {
    settings_store: Arc<SettingsStore>,
    cached: RwLock<Option<bool>>,
}

impl PasswordlessFlag {
    pub fn new(settings_store: Arc<SettingsStore>) -> Self {
        Self {
            settings_store,
            cached: RwLock::new(None),
        }
    }

    /// Whether passwordless login is currently enabled
    ///
    /// Loads from the database on a cache miss and caches the result
    /// until `invalidate` is called.
    pub async fn is_enabled(&self) -> Result<bool, InternalError> {
        if let Some(value) = *self.cached.read().expect("passwordless flag lock poisoned") {
            return Ok(value);
        }

        let value = self.settings_store.get().await?.passwordless_login;
        *self.cached.write().expect("passwordless flag lock poisoned") = Some(value);

        Ok(value)
    }

    /// Drop the cached value; the next read reloads from the database
    pub fn invalidate(&self) {
        *self.cached.write().expect("passwordless flag lock poisoned") = None;
    }
}

impl std::fmt::Debug for PasswordlessFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordlessFlag")
            .field("cached", &*self.cached.read().expect("passwordless flag lock poisoned"))
            .finish()
    }
}
