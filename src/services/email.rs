//! Email service for subscriber notifications

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

/// Outgoing mail collaborator.
///
/// `send_email` returns once the message is handed off. Delivery itself is
/// fire-and-forget: SMTP failures are logged by the implementation and never
/// reach the caller.
#[cfg_attr(test, mockall::automock)]
pub trait Mailer: Send + Sync {
    fn send_email(&self, recipients: &[String], subject: &str, body: &str) -> AppResult<()>;
}

#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, recipients: &[String], subject: &str, body: &str) -> AppResult<Message> {
        let from_name = self
            .config
            .smtp_from_name
            .as_deref()
            .unwrap_or("Maktaba");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        // Recipients go in Bcc so subscribers don't see each other
        let mut builder = Message::builder()
            .from(from_mailbox.clone())
            .to(from_mailbox)
            .subject(subject);

        for recipient in recipients {
            match Mailbox::from_str(recipient) {
                Ok(mailbox) => builder = builder.bcc(mailbox),
                Err(e) => tracing::warn!("Skipping invalid recipient {}: {}", recipient, e),
            }
        }

        builder
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
                            .body(html_body(body)),
                    ),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))
    }

    fn build_transport(&self) -> AppResult<SmtpTransport> {
        let mailer_builder = if self.config.smtp_use_tls {
            // Use STARTTLS for secure connection
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer_builder = if let (Some(username), Some(password)) = (
            &self.config.smtp_username,
            &self.config.smtp_password,
        ) {
            mailer_builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer_builder
        };

        Ok(mailer_builder.build())
    }
}

/// Wrap a plain-text body in HTML, escaping any markup it contains
fn html_body(body: &str) -> String {
    let escaped = body
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\n', "<br>");
    format!(r#"<html><body><p>{}</p></body></html>"#, escaped)
}

impl Mailer for EmailService {
    fn send_email(&self, recipients: &[String], subject: &str, body: &str) -> AppResult<()> {
        if !self.config.enabled {
            tracing::info!(
                recipients = recipients.len(),
                subject,
                "Email delivery disabled, notification not sent"
            );
            return Ok(());
        }

        let email = self.build_message(recipients, subject, body)?;
        let transport = self.build_transport()?;
        let subject = subject.to_string();
        let count = recipients.len();

        let deliver = move || match transport.send(&email) {
            Ok(_) => tracing::info!("Sent \"{}\" to {} recipient(s)", subject, count),
            Err(e) => tracing::warn!("Failed to send \"{}\": {}", subject, e),
        };

        // SMTP is blocking; keep it off the async workers when a runtime is available
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(deliver);
            }
            Err(_) => deliver(),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_email_is_a_no_op() {
        let service = EmailService::new(EmailConfig::default());
        let result = service.send_email(&["reader@example.org".to_string()], "Subject", "Body");
        assert!(result.is_ok());
    }

    #[test]
    fn test_message_skips_invalid_recipients() {
        let service = EmailService::new(EmailConfig::default());
        let message = service
            .build_message(
                &["reader@example.org".to_string(), "not an address".to_string()],
                "Book Published",
                "The book \"Dune\" has been published.",
            )
            .unwrap();
        let envelope: Vec<&str> = message.envelope().to().iter().map(|a| a.as_ref()).collect();
        assert!(envelope.contains(&"reader@example.org"));
        assert!(envelope.contains(&"noreply@maktaba.org"));
        assert_eq!(envelope.len(), 2);
    }

    #[test]
    fn test_html_body_escapes_markup() {
        let html = html_body("The book \"<script>alert(1)</script> & co\" has been published.\nEnjoy");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt; &amp; co"));
        assert!(html.contains("published.<br>Enjoy"));
    }
}
