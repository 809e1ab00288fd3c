//! SMTP notifier

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::str::FromStr;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
};

/// Delivery capability used by the dispatcher
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message; errors are `AppError::Transport`
    async fn send(&self, to: &str, subject: &str, body: &str) -> AppResult<()>;
}

#[derive(Clone)]
pub struct EmailService {
    from: Mailbox,
    mailer: SmtpTransport,
}

impl EmailService {
    pub fn new(config: &EmailConfig) -> AppResult<Self> {
        let from_name = config.smtp_from_name.as_deref().unwrap_or("LibMaster");
        let from = Mailbox::from_str(&format!("{} <{}>", from_name, config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        let mailer_builder = if config.smtp_use_tls {
            SmtpTransport::starttls_relay(&config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&config.smtp_host)
        }
        .port(config.smtp_port);

        let mailer_builder = if let (Some(username), Some(password)) =
            (&config.smtp_username, &config.smtp_password)
        {
            mailer_builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer_builder
        };

        Ok(Self {
            from,
            mailer: mailer_builder.build(),
        })
    }

    fn build_message(&self, to: &str, subject: &str, body: &str) -> AppResult<Message> {
        let to_mailbox = Mailbox::from_str(to)
            .map_err(|e| AppError::Transport(format!("Invalid to address '{}': {}", to, e)))?;

        Message::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(format!(
                                r#"<html><body><pre>{}</pre></body></html>"#,
                                body.replace('\n', "<br>")
                            )),
                    ),
            )
            .map_err(|e| AppError::Transport(format!("Failed to build email: {}", e)))
    }
}

#[async_trait]
impl Notifier for EmailService {
    async fn send(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        let email = self.build_message(to, subject, body)?;
        let mailer = self.mailer.clone();

        // lettre's SmtpTransport blocks on network I/O
        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::Internal(format!("Email task failed: {}", e)))?
            .map_err(|e| AppError::Transport(format!("Failed to send email: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> EmailService {
        EmailService::new(&EmailConfig {
            smtp_use_tls: false,
            ..EmailConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_rejects_invalid_recipient() {
        let err = service().build_message("not an address", "Hi", "Body").unwrap_err();
        assert!(matches!(err, AppError::Transport(_)));
    }

    #[test]
    fn test_builds_message() {
        let message = service()
            .build_message("Ada <ada@example.org>", "Borrow Request Approved", "Line 1\nLine 2")
            .unwrap();
        let headers = message.headers().to_string();
        assert!(headers.contains("Subject: Borrow Request Approved"));
        assert!(headers.contains("ada@example.org"));
    }

    #[test]
    fn test_invalid_from_address() {
        let result = EmailService::new(&EmailConfig {
            smtp_from: "nope".to_string(),
            smtp_use_tls: false,
            ..EmailConfig::default()
        });
        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
