//! Outgoing mail.
//!
//! [`SmtpMailer`] delivers through a relay with lettre. [`LogMailer`] only logs the
//! message and is used when no SMTP host is configured.

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::errors::AppError;

/// A message ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Delivers [`OutgoingMail`].
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), AppError>;
}

/// Mailer that relays through an SMTP server.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig, from: &str) -> Result<Self, AppError> {
        // Port 465 speaks TLS from the first byte; everything else upgrades with STARTTLS
        let builder = if config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        };

        let mut builder = builder.port(config.port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: from.parse()?,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), AppError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(mail.to.parse()?)
            .subject(mail.subject)
            .header(ContentType::TEXT_HTML)
            .body(mail.html)?;

        self.transport.send(message).await?;
        tracing::info!("Sent mail to {}", mail.to);
        Ok(())
    }
}

/// Mailer that writes messages to the log instead of sending them.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), AppError> {
        tracing::info!(
            to = %mail.to,
            subject = %mail.subject,
            "SMTP not configured, mail not delivered:\n{}",
            mail.html
        );
        Ok(())
    }
}

/// The password-reset message carrying the single-use link.
pub fn password_reset_mail(to: &str, link: &str) -> OutgoingMail {
    OutgoingMail {
        to: to.to_string(),
        subject: "Password reset token".to_string(),
        html: format!(
            "<p>You are receiving this email because you (or someone else) has requested \
             the reset of a password.</p>\
             <p>Make a POST request with your new password to: <a href=\"{link}\">{link}</a></p>\
             <p>The link expires in two hours.</p>"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_reset_mail_contains_link() {
        let mail = password_reset_mail(
            "jane@example.com",
            "http://localhost:5000/api/v1/auth/resetpassword/abc123",
        );
        assert_eq!(mail.to, "jane@example.com");
        assert!(mail
            .html
            .contains("http://localhost:5000/api/v1/auth/resetpassword/abc123"));
    }

    #[tokio::test]
    async fn test_log_mailer_accepts_mail() {
        let mail = password_reset_mail("jane@example.com", "http://x/reset/1");
        assert!(LogMailer.send(mail).await.is_ok());
    }

    #[test]
    fn test_smtp_mailer_rejects_bad_sender() {
        let config = SmtpConfig {
            host: "localhost".into(),
            port: 2525,
            username: None,
            password: None,
        };
        assert!(SmtpMailer::new(&config, "not an address").is_err());
    }
}
