use crate::core::config::SmtpConfig;
use crate::core::error::{AppError, AppResult};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

/// Outbound mail transport consumed by the queue workers.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, to: &str, subject: &str, text: &str) -> AppResult<()>;
}

/// SMTP mail sender
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn build_transport(&self) -> AppResult<AsyncSmtpTransport<Tokio1Executor>> {
        let creds = Credentials::new(
            self.config.username.clone(),
            self.config.password.clone(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.server)
            .map_err(|e| AppError::Send(format!("invalid SMTP relay {}: {}", self.config.server, e)))?
            .port(self.config.port)
            .credentials(creds)
            .build();

        Ok(transport)
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, text: &str) -> AppResult<()> {
        info!("Sending text email to {}: {}", to, subject);

        let email = Message::builder()
            .from(
                self.config
                    .username
                    .parse()
                    .map_err(|e| AppError::Send(format!("invalid from address: {}", e)))?,
            )
            .to(to
                .parse()
                .map_err(|e| AppError::Send(format!("invalid recipient '{}': {}", to, e)))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(text.to_string())
            .map_err(|e| AppError::Send(format!("failed to build message: {}", e)))?;

        let mailer = self.build_transport()?;
        mailer
            .send(email)
            .await
            .map_err(|e| AppError::Send(format!("SMTP delivery to {} failed: {}", to, e)))?;

        info!("Text email sent successfully to {}", to);
        Ok(())
    }
}
