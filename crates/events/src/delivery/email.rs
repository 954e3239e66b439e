//! Email delivery via SMTP.
//!
//! [`SmtpEmail`] renders a notification template and sends it as a
//! plain-text message over the `lettre` async SMTP transport. If `SMTP_HOST`
//! is not set, [`EmailConfig::from_env`] returns `None` and the email channel
//! is disabled.

use async_trait::async_trait;
use giftlock_core::templates::{render, TemplateData, TemplateKind};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{DeliveryResult, EmailProvider};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

const DEFAULT_FROM_ADDRESS: &str = "Giftlock <noreply@giftlock.local>";

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// RFC 5322 "From" mailbox.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable        | Required | Default                              |
    /// |-----------------|----------|--------------------------------------|
    /// | `SMTP_HOST`     | yes      |                                      |
    /// | `SMTP_PORT`     | no       | `587`                                |
    /// | `SMTP_FROM`     | no       | `Giftlock <noreply@giftlock.local>`  |
    /// | `SMTP_USER`     | no       |                                      |
    /// | `SMTP_PASSWORD` | no       |                                      |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok().filter(|h| !h.is_empty())?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// SmtpEmail
// ---------------------------------------------------------------------------

pub struct SmtpEmail {
    from_address: String,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpEmail {
    /// Build the SMTP transport. Connections are opened lazily on first send.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            from_address: config.from_address,
            mailer: builder.build(),
        })
    }

    async fn deliver(
        &self,
        to: &str,
        kind: TemplateKind,
        data: &TemplateData,
    ) -> Result<(), EmailError> {
        let email = build_message(&self.from_address, to, kind, data)?;
        self.mailer.send(email).await?;
        Ok(())
    }
}

fn build_message(
    from: &str,
    to: &str,
    kind: TemplateKind,
    data: &TemplateData,
) -> Result<Message, EmailError> {
    let rendered = render(kind, data);
    Message::builder()
        .from(from.parse()?)
        .to(to.parse()?)
        .subject(rendered.email_subject)
        .header(ContentType::TEXT_PLAIN)
        .body(rendered.email_body)
        .map_err(|e| EmailError::Build(e.to_string()))
}

#[async_trait]
impl EmailProvider for SmtpEmail {
    async fn send_email(
        &self,
        to: &str,
        kind: TemplateKind,
        data: &TemplateData,
    ) -> DeliveryResult {
        match self.deliver(to, kind, data).await {
            Ok(()) => {
                tracing::info!(to, template = %kind, "Notification email sent");
                DeliveryResult::delivered()
            }
            Err(e) => {
                tracing::error!(to, template = %kind, error = %e, "Email delivery failed");
                DeliveryResult::failed(e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> TemplateData {
        TemplateData {
            sender_name: "Sam".into(),
            gift_type: "gift card".into(),
            challenge_description: "Run a mile".into(),
            ..Default::default()
        }
    }

    #[test]
    fn builds_message_from_template() {
        let message = build_message(
            DEFAULT_FROM_ADDRESS,
            "alex@example.com",
            TemplateKind::GiftReceived,
            &data(),
        )
        .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Sam sent you a gift"));
        assert!(raw.contains("To: alex@example.com"));
    }

    #[test]
    fn bad_recipient_address_is_an_address_error() {
        let err = build_message(DEFAULT_FROM_ADDRESS, "nope", TemplateKind::GiftReceived, &data())
            .unwrap_err();
        assert!(err.to_string().contains("Email address parse error"));
    }

    #[test]
    fn email_error_display_build() {
        let err = EmailError::Build("missing body".to_string());
        assert_eq!(err.to_string(), "Email build error: missing body");
    }
}
