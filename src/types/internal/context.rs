/// Per-request client metadata, extracted at the HTTP boundary and threaded
/// through services for rate-limit keys, session records and audit rows.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn new(ip_address: Option<String>, user_agent: Option<String>) -> Self {
        Self {
            ip_address,
            user_agent,
        }
    }

    /// Rate-limit identity for this client. Falls back to a shared bucket
    /// when the IP is unknown rather than skipping limiting entirely.
    pub fn rate_limit_identity(&self) -> &str {
        self.ip_address.as_deref().unwrap_or("unknown")
    }
}
