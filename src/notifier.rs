use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::EmailConfig;
use crate::error::Result;
use crate::types::{ProductCheckResult, Tier};

/// Delivery seam. Sends may fail for network/auth reasons; the orchestrator
/// treats failure as retryable and never as fatal.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<()>;
}

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpNotifier {
    pub fn new(cfg: &EmailConfig) -> Result<Self> {
        let builder = if cfg.implicit_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.smtp_host)?
        };
        let mut builder = builder.port(cfg.smtp_port);
        if let (Some(user), Some(pass)) = (&cfg.username, &cfg.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: cfg.from.parse()?,
            to: cfg.to.parse()?,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .body(body.to_string())?;
        self.transport.send(email).await?;
        Ok(())
    }
}

/// Build the alert subject and plain-text body for a tier entry.
pub fn compose_alert(result: &ProductCheckResult, tier: Tier) -> (String, String) {
    let subject = format!("{}: {}", tier.label(), result.name);
    let price = result
        .price
        .map(|p| format!("${p:.2}"))
        .unwrap_or_else(|| "n/a".to_string());
    let body = format!(
        "Product: {}\nPrice: {}\nTier: {}\nStatus: In stock\nURL: {}\n\nChecked at: {}\n",
        result.name,
        price,
        tier.label(),
        result.url,
        result.checked_at.to_rfc3339(),
    );
    (subject, body)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
