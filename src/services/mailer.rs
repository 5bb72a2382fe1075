use async_trait::async_trait;

use crate::errors::InternalError;

/// Delivery seam for magic-link emails
///
/// The core never renders or sends mail itself; it hands the login URL
/// to whatever implementation is wired in. The default implementation
/// logs the link, which is also how local development reads it.
#[async_trait]
pub trait LoginLinkMailer: Send + Sync {
    async fn send_login_link(
        &self,
        email: &str,
        name: &str,
        login_url: &str,
    ) -> Result<(), InternalError>;
}

/// Mailer that emits the login link to the log stream
#[derive(Debug, Default)]
pub struct TracingMailer;

#[async_trait]
impl LoginLinkMailer for TracingMailer {
    async fn send_login_link(
        &self,
        email: &str,
        name: &str,
        login_url: &str,
    ) -> Result<(), InternalError> {
        tracing::info!(
            email = %email,
            name = %name,
            login_url = %login_url,
            "Login link issued"
        );
        Ok(())
    }
}

/// Mailer that records deliveries in memory for assertions
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: std::sync::Mutex<Vec<SentLink>>,
}

#[derive(Debug, Clone)]
pub struct SentLink {
    pub email: String,
    pub name: String,
    pub login_url: String,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentLink> {
        self.sent.lock().expect("mailer lock poisoned").clone()
    }
}

#[async_trait]
impl LoginLinkMailer for RecordingMailer {
    async fn send_login_link(
        &self,
        email: &str,
        name: &str,
        login_url: &str,
    ) -> Result<(), InternalError> {
        self.sent.lock().expect("mailer lock poisoned").push(SentLink {
            email: email.to_string(),
            name: name.to_string(),
            login_url: login_url.to_string(),
        });
        Ok(())
    }
}
