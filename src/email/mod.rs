use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::{
    config::EmailConfig,
    error::{AppError, Result},
};

pub mod templates;

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<()>;
}

pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailSender {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let host = config
            .smtp_host
            .as_deref()
            .ok_or_else(|| AppError::Internal("SMTP host not configured".to_string()))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| AppError::External(format!("SMTP setup failed: {}", e)))?
            .port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let from = config
            .from_address
            .parse::<Mailbox>()
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        let to = message
            .to
            .parse::<Mailbox>()
            .map_err(|e| AppError::Validation(format!("Invalid recipient {}: {}", message.to, e)))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&message.subject)
            .header(ContentType::TEXT_HTML)
            .body(message.html_body)
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| AppError::External(format!("SMTP delivery failed: {}", e)))?;

        Ok(())
    }
}

/// Used when SMTP is not configured: logs what would have been sent.
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "Email delivery disabled; message not sent"
        );
        Ok(())
    }
}
