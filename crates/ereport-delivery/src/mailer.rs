use std::path::Path;

use async_trait::async_trait;
use tracing::{error, info};

use crate::error::Result;

/// Sends a rendered report as an email attachment.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Email `attachment` to a single recipient.
    async fn send(&self, attachment: &Path, recipient: &str, subject: &str, body: &str)
        -> Result<()>;

    /// Email `attachment` to every recipient in turn.
    ///
    /// A failed recipient is logged and skipped. Returns how many sends
    /// succeeded.
    async fn send_bulk(
        &self,
        attachment: &Path,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> usize {
        let mut delivered = 0;
        for recipient in recipients {
            match self.send(attachment, recipient, subject, body).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    error!(recipient = %recipient, code = e.code(), error = %e, "could not send report");
                }
            }
        }
        info!(
            subject,
            delivered,
            recipients = recipients.len(),
            "report emailed"
        );
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeliveryError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Mailer for Recording {
        async fn send(&self, _: &Path, recipient: &str, _: &str, _: &str) -> Result<()> {
            if recipient.starts_with("bad") {
                return Err(DeliveryError::Parse(format!("rejected {recipient}")));
            }
            self.sent.lock().unwrap().push(recipient.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn bulk_send_continues_past_failures() {
        let mailer = Recording::default();
        let recipients = vec![
            "a@example.com".to_string(),
            "bad@example.com".to_string(),
            "b@example.com".to_string(),
        ];
        let delivered = mailer
            .send_bulk(Path::new("report.xlsx"), &recipients, "Stock", "weekly")
            .await;
        assert_eq!(delivered, 2);
        assert_eq!(
            *mailer.sent.lock().unwrap(),
            vec!["a@example.com".to_string(), "b@example.com".to_string()]
        );
    }
}
