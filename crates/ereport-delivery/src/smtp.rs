//! SMTP delivery via `lettre`.

use std::path::Path;

use async_trait::async_trait;
use ereport_core::config::SmtpConfig;
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::error::{DeliveryError, Result};
use crate::mailer::Mailer;

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const IMPLICIT_TLS_PORT: u16 = 465;
const FALLBACK_ATTACHMENT_NAME: &str = "report.xlsx";

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build a mailer from `[smtp]` settings.
    ///
    /// Port 465 uses implicit TLS; other ports use STARTTLS when `tls` is set
    /// and plain SMTP otherwise. The sender address doubles as the login.
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let from: Mailbox = config.sender.parse()?;

        let mut builder = if config.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?.port(config.port)
        } else if config.tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?.port(config.port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host).port(config.port)
        };

        if !config.password.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.sender.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(
        &self,
        attachment: &Path,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<()> {
        info!(recipient, subject, "sending report email");
        let content = tokio::fs::read(attachment).await?;
        let file_name = attachment
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(FALLBACK_ATTACHMENT_NAME);
        let email = build_message(&self.from, recipient, subject, body, file_name, content)?;
        self.transport.send(email).await?;
        info!(recipient, "report email sent");
        Ok(())
    }
}

/// HTML body plus the workbook as an attachment.
fn build_message(
    from: &Mailbox,
    recipient: &str,
    subject: &str,
    body: &str,
    file_name: &str,
    content: Vec<u8>,
) -> Result<Message> {
    let to: Mailbox = recipient.parse()?;
    let content_type =
        ContentType::parse(XLSX_CONTENT_TYPE).map_err(|e| DeliveryError::Parse(e.to_string()))?;

    let message = Message::builder()
        .from(from.clone())
        .to(to)
        .subject(subject)
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::html(body.to_string()))
                .singlepart(Attachment::new(file_name.to_string()).body(content, content_type)),
        )?;
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(sender: &str, port: u16) -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".into(),
            port,
            sender: sender.into(),
            password: "secret".into(),
            tls: true,
        }
    }

    #[test]
    fn message_carries_body_and_attachment() {
        let from: Mailbox = "reports@example.com".parse().unwrap();
        let message = build_message(
            &from,
            "alice@example.com",
            "Weekly stock",
            "<p>Stock levels</p>",
            "Weekly stock.xlsx",
            vec![1, 2, 3],
        )
        .unwrap();
        let raw = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(raw.contains("Subject: Weekly stock"));
        assert!(raw.contains("To: alice@example.com"));
        assert!(raw.contains("text/html"));
        assert!(raw.contains(XLSX_CONTENT_TYPE));
        assert!(raw.contains("Weekly stock.xlsx"));
    }

    #[test]
    fn invalid_recipient_is_rejected() {
        let from: Mailbox = "reports@example.com".parse().unwrap();
        let err = build_message(&from, "not-an-email", "s", "b", "r.xlsx", vec![]).unwrap_err();
        assert_eq!(err.code(), "ADDRESS_ERROR");
    }

    #[tokio::test]
    async fn mailer_builds_for_both_tls_modes() {
        assert!(SmtpMailer::new(&config("reports@example.com", 587)).is_ok());
        assert!(SmtpMailer::new(&config("reports@example.com", 465)).is_ok());
    }

    #[test]
    fn sender_must_be_an_address() {
        assert!(matches!(
            SmtpMailer::new(&config("", 587)),
            Err(DeliveryError::Address(_))
        ));
    }

    #[tokio::test]
    async fn missing_attachment_is_io_error() {
        let mailer = SmtpMailer::new(&config("reports@example.com", 587)).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let err = mailer
            .send(&dir.path().join("gone.xlsx"), "a@example.com", "s", "b")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "IO_ERROR");
    }
}
