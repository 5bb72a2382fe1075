use crate::errors::InternalError;
use crate::services::crypto;

/// Signs and verifies magic-link URLs
///
/// The signature covers the route name, the opaque token and the URL
/// expiry timestamp, so none of the three can be swapped independently.
/// URL expiry is separate from the token's server-side TTL; both are
/// checked on authenticate.
pub struct LinkSigner {
    app_key: String,
}

/// Query parameters of a signed login link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedLink {
    pub token: String,
    pub expires: i64,
    pub signature: String,
}

const ROUTE_NAME: &str = "magic.authenticate";

impl LinkSigner {
    pub fn new(app_key: String) -> Self {
        Self { app_key }
    }

    /// Sign a token with the given URL expiry timestamp
    pub fn sign(&self, token: &str, expires: i64) -> Result<SignedLink, InternalError> {
        let message = format!("{}|{}|{}", ROUTE_NAME, token, expires);
        let signature = crypto::hmac_sha256_hex(&self.app_key, &message)?;

        Ok(SignedLink {
            token: token.to_string(),
            expires,
            signature,
        })
    }

    /// Verify a presented link against the signature and URL expiry
    ///
    /// Signature is checked before expiry so a forged link never learns
    /// whether its timestamp was plausible.
    pub fn verify(
        &self,
        token: &str,
        expires: i64,
        signature: &str,
        now: i64,
    ) -> Result<bool, InternalError> {
        let message = format!("{}|{}|{}", ROUTE_NAME, token, expires);
        if !crypto::verify_hmac(&self.app_key, &message, signature)? {
            return Ok(false);
        }

        Ok(now <= expires)
    }

    /// Render the full login URL for a signed link
    pub fn login_url(&self, base_url: &str, link: &SignedLink) -> String {
        format!(
            "{}/auth/magic/authenticate?token={}&expires={}&signature={}",
            base_url.trim_end_matches('/'),
            link.token,
            link.expires,
            link.signature
        )
    }
}

impl std::fmt::Debug for LinkSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkSigner")
            .field("app_key", &"<redacted>")
            .finish()
    }
}
