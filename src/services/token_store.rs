use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::services::clock::Clock;

/// Magic-link token TTL in seconds; matches the URL expiry window
pub const TOKEN_TTL_SECONDS: i64 = 600;

/// In-process store of outstanding magic-link tokens
///
/// Tokens are single use: `consume` removes the entry and returns its
/// payload in one step under the lock, so two concurrent presentations
/// of the same token can never both succeed.
pub struct TokenStore {
    clock: Arc<dyn Clock>,
    tokens: Mutex<HashMap<String, TokenEntry>>,
}

/// Payload stored against a magic token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPayload {
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, Clone)]
struct TokenEntry {
    payload: TokenPayload,
    expires_at: i64,
}

impl TokenStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Store a token with the standard TTL
    pub fn put(&self, token: String, payload: TokenPayload) {
        let expires_at = self.clock.now_timestamp() + TOKEN_TTL_SECONDS;
        self.tokens
            .lock()
            .expect("token store lock poisoned")
            .insert(token, TokenEntry { payload, expires_at });
    }

    /// Atomically remove and return the payload for `token`
    ///
    /// Returns None for unknown, already-consumed or expired tokens;
    /// expired entries are removed on the way out.
    pub fn consume(&self, token: &str) -> Option<TokenPayload> {
        let mut tokens = self.tokens.lock().expect("token store lock poisoned");

        let entry = tokens.remove(token)?;
        if self.clock.now_timestamp() >= entry.expires_at {
            return None;
        }

        Some(entry.payload)
    }

    /// Peek without consuming (diagnostics only)
    pub fn contains(&self, token: &str) -> bool {
        let now = self.clock.now_timestamp();
        self.tokens
            .lock()
            .expect("token store lock poisoned")
            .get(token)
            .map(|entry| now < entry.expires_at)
            .unwrap_or(false)
    }

    /// Invalidate every outstanding token for one user
    /// (account disabled or deleted mid-flight)
    pub fn remove_for_user(&self, user_id: &str) {
        self.tokens
            .lock()
            .expect("token store lock poisoned")
            .retain(|_, entry| entry.payload.user_id != user_id);
    }

    /// Drop expired entries
    pub fn purge_expired(&self) {
        let now = self.clock.now_timestamp();
        self.tokens
            .lock()
            .expect("token store lock poisoned")
            .retain(|_, entry| now < entry.expires_at);
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tokens = self.tokens.lock().expect("token store lock poisoned");
        // Token values are secrets; only the count is shown
        f.debug_struct("TokenStore")
            .field("outstanding", &tokens.len())
            .finish()
    }
}
