//! Outgoing email: rendering, transports and the immediate-send queue.

pub mod email;
pub mod queue;
pub mod render;
pub mod resend;
pub mod router;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

pub use email::SmtpMailer;
pub use queue::{NotifyQueue, QueueStats};
pub use resend::ResendMailer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;
    fn name(&self) -> &'static str;
}

pub type DynMailer = Arc<dyn Mailer>;

/// Writes the envelope to the log instead of sending. Used when no transport is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        tracing::info!(
            target: "notify",
            to = %email.to,
            subject = %email.subject,
            text_len = email.text.len(),
            "email not sent (no transport configured)"
        );
        Ok(())
    }
    fn name(&self) -> &'static str {
        "log"
    }
}

/// Resend when `RESEND_API_KEY` + `RESEND_FROM` are set, else SMTP when
/// `SMTP_HOST` is set, else the log-only mailer.
pub fn mailer_from_env() -> Result<DynMailer> {
    if let Some(m) = ResendMailer::from_env() {
        return Ok(Arc::new(m));
    }
    if std::env::var("SMTP_HOST").map(|h| !h.trim().is_empty()).unwrap_or(false) {
        return Ok(Arc::new(SmtpMailer::from_env()?));
    }
    tracing::warn!(target: "notify", "no mail transport configured; emails will only be logged");
    Ok(Arc::new(LogMailer))
}
