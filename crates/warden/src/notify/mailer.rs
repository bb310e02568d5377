//! Mailer — SMTP delivery behind the `Notify` trait.

use std::pin::Pin;

use chrono::Utc;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::conf::model::EmailConfig;

use super::model::{Notification, SendOutcome};
use super::render;

/// Delivery seam for notifications. The mailer is the production
/// implementation; tests substitute a recording double.
pub trait Notify: Send + Sync {
    fn send<'a>(
        &'a self,
        notification: &'a Notification,
    ) -> Pin<Box<dyn std::future::Future<Output = SendOutcome> + Send + 'a>>;
}

pub struct Mailer {
    config: EmailConfig,
}

impl Mailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, String> {
        let builder = if self.config.use_ssl {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_server)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_server)
        }
        .map_err(|e| format!("SMTP transport setup failed: {e}"))?;

        Ok(builder
            .port(self.config.smtp_port)
            .credentials(Credentials::new(
                self.config.sender.clone(),
                self.config.password.clone(),
            ))
            .build())
    }

    async fn send_email(&self, subject: &str, body: &str) -> SendOutcome {
        if !self.config.enabled {
            return SendOutcome::failed("email notifications are disabled");
        }
        if self.config.recipients.is_empty() {
            return SendOutcome::failed("no recipients configured");
        }

        let from = match self.config.sender.parse() {
            Ok(mailbox) => mailbox,
            Err(e) => return SendOutcome::failed(format!("invalid sender address: {e}")),
        };

        let mut builder = Message::builder().from(from).subject(subject);
        for recipient in &self.config.recipients {
            match recipient.parse() {
                Ok(mailbox) => builder = builder.to(mailbox),
                Err(e) => {
                    return SendOutcome::failed(format!("invalid recipient {recipient}: {e}"))
                }
            }
        }

        let message = match builder
            .header(ContentType::TEXT_HTML)
            .body(body.to_string())
        {
            Ok(message) => message,
            Err(e) => return SendOutcome::failed(format!("failed to build message: {e}")),
        };

        let transport = match self.build_transport() {
            Ok(transport) => transport,
            Err(e) => return SendOutcome::failed(e),
        };

        // transport failure is reported, never retried here
        match transport.send(message).await {
            Ok(_) => SendOutcome::ok(format!(
                "email sent to {}",
                self.config.recipients.join(", ")
            )),
            Err(e) => SendOutcome::failed(format!("SMTP error: {e}")),
        }
    }
}

impl Notify for Mailer {
    fn send<'a>(
        &'a self,
        notification: &'a Notification,
    ) -> Pin<Box<dyn std::future::Future<Output = SendOutcome> + Send + 'a>> {
        Box::pin(async move {
            let (subject, body) = render::render(notification, Utc::now());
            let outcome = self.send_email(&subject, &body).await;
            if !outcome.success {
                tracing::warn!(
                    container = notification.container_name(),
                    error = outcome.error.as_deref().unwrap_or(""),
                    "notification delivery failed"
                );
            }
            outcome
        })
    }
}

/// Test double that records every notification instead of delivering it.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: std::sync::Mutex<Vec<Notification>>,
    pub fail: bool,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: std::sync::Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Notify for RecordingNotifier {
    fn send<'a>(
        &'a self,
        notification: &'a Notification,
    ) -> Pin<Box<dyn std::future::Future<Output = SendOutcome> + Send + 'a>> {
        Box::pin(async move {
            self.sent.lock().unwrap().push(notification.clone());
            if self.fail {
                SendOutcome::failed("scripted failure")
            } else {
                SendOutcome::ok("recorded")
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert() -> Notification {
        Notification::Alert {
            container_name: "web".to_string(),
            fault_type: "CPU_HIGH".to_string(),
            current_cpu: "91%".to_string(),
            current_memory: "50%".to_string(),
            reason: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn disabled_config_short_circuits() {
        let mailer = Mailer::new(EmailConfig {
            enabled: false,
            ..Default::default()
        });
        let outcome = mailer.send(&alert()).await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("disabled"));
    }

    #[tokio::test]
    async fn missing_recipients_is_an_error_not_a_panic() {
        let mailer = Mailer::new(EmailConfig {
            enabled: true,
            smtp_server: "smtp.example.com".to_string(),
            sender: "warden@example.com".to_string(),
            recipients: vec![],
            ..Default::default()
        });
        let outcome = mailer.send(&alert()).await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("recipients"));
    }

    #[tokio::test]
    async fn invalid_sender_is_reported() {
        let mailer = Mailer::new(EmailConfig {
            enabled: true,
            smtp_server: "smtp.example.com".to_string(),
            sender: "not an address".to_string(),
            recipients: vec!["ops@example.com".to_string()],
            ..Default::default()
        });
        let outcome = mailer.send(&alert()).await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("sender"));
    }
}
