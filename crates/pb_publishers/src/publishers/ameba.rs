use std::fmt;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use pb_core::{Error, PublishRequest, PublishResult, Publisher, Result};
use tracing::{error, info};

use super::{CHECK_TIMEOUT, PUBLISH_TIMEOUT};

pub const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Posts to Ameba Blog through its mail-to-blog address. The title becomes
/// the subject and the markdown body is sent as plain text over STARTTLS.
pub struct AmebaPublisher {
    from: Mailbox,
    to: Mailbox,
    smtp_server: String,
    smtp_port: u16,
    smtp_password: String,
    blog_url: Option<String>,
}

impl fmt::Debug for AmebaPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmebaPublisher")
            .field("from", &self.from.email.to_string())
            .field("to", &self.to.email.to_string())
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_password", &"<redacted>")
            .finish()
    }
}

fn mailbox(label: &str, address: &str) -> Result<Mailbox> {
    address
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("invalid {} address {:?}: {}", label, address, e)))
}

impl AmebaPublisher {
    pub fn new(
        from_email: &str,
        posting_email: &str,
        smtp_server: String,
        smtp_port: u16,
        smtp_password: String,
    ) -> Result<Self> {
        if smtp_password.is_empty() {
            return Err(Error::Config("Ameba SMTP password is required".to_string()));
        }
        Ok(Self {
            from: mailbox("sender", from_email)?,
            to: mailbox("posting", posting_email)?,
            smtp_server,
            smtp_port,
            smtp_password,
            blog_url: None,
        })
    }

    /// Reported as the article URL. Mail posting returns no link, so without
    /// it the result carries a `mailto:` URL for the posting address.
    pub fn with_blog_url(mut self, blog_url: String) -> Self {
        self.blog_url = Some(blog_url);
        self
    }

    fn message(&self, request: &PublishRequest) -> Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(request.title.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(request.body.clone())
            .map_err(|e| Error::Publish(format!("failed to build mail: {}", e)))
    }

    fn transport(&self, timeout: std::time::Duration) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let credentials = Credentials::new(self.from.email.to_string(), self.smtp_password.clone());
        Ok(AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.smtp_server)
            .map_err(|e| Error::Config(format!("SMTP server {}: {}", self.smtp_server, e)))?
            .port(self.smtp_port)
            .credentials(credentials)
            .timeout(Some(timeout))
            .build())
    }

    async fn send(&self, request: &PublishRequest) -> Result<String> {
        let message = self.message(request)?;
        self.transport(PUBLISH_TIMEOUT)?
            .send(message)
            .await
            .map_err(|e| Error::Network(format!("SMTP send failed: {}", e)))?;
        Ok(self
            .blog_url
            .clone()
            .unwrap_or_else(|| format!("mailto:{}", self.to.email)))
    }
}

#[async_trait]
impl Publisher for AmebaPublisher {
    fn service_name(&self) -> &str {
        "ameba"
    }

    async fn publish(&self, request: &PublishRequest) -> Result<PublishResult> {
        match self.send(request).await {
            Ok(url) => {
                info!("Mailed article to Ameba: {}", request.title);
                Ok(PublishResult::success(self.service_name(), url))
            }
            Err(e) => {
                error!("Ameba post failed: {}", e);
                Ok(PublishResult::failure(self.service_name(), e.to_string()))
            }
        }
    }

    /// Opens a STARTTLS session and logs in.
    async fn test_connection(&self) -> bool {
        let transport = match self.transport(CHECK_TIMEOUT) {
            Ok(transport) => transport,
            Err(e) => {
                error!("Ameba connection test failed: {}", e);
                return false;
            }
        };
        match transport.test_connection().await {
            Ok(ok) => ok,
            Err(e) => {
                error!("Ameba connection test failed: {}", e);
                false
            }
        }
    }
}
