use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use lettre::message::{Mailbox, Message, MultiPart, SinglePart};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::{Mailer, OutgoingEmail};
use crate::ingest::http::required_env;

pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// SMTP_HOST, SMTP_USER, SMTP_PASS, SMTP_FROM required; SMTP_PORT (587) and
    /// SMTP_SECURE (implicit TLS when "true") optional.
    pub fn from_env() -> Result<Self> {
        let host = required_env("SMTP_HOST")?;
        let user = required_env("SMTP_USER")?;
        let pass = required_env("SMTP_PASS")?;
        let from_addr = required_env("SMTP_FROM")?;
        let port: u16 = match std::env::var("SMTP_PORT") {
            Ok(p) if !p.trim().is_empty() => p.trim().parse().context("invalid SMTP_PORT")?,
            _ => 587,
        };
        let secure = std::env::var("SMTP_SECURE")
            .map(|v| v.trim() == "true")
            .unwrap_or(false);

        let builder = if secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host)
        }
        .context("invalid SMTP_HOST")?;

        let mailer = builder
            .port(port)
            .credentials(Credentials::new(user, pass))
            .build();
        let from = from_addr
            .parse()
            .map_err(|e| anyhow!("invalid SMTP_FROM: {e}"))?;

        Ok(Self { mailer, from })
    }
}

/// Plain text, or text + HTML alternative when HTML is present.
pub fn build_message(from: &Mailbox, email: &OutgoingEmail) -> Result<Message> {
    let to: Mailbox = email
        .to
        .parse()
        .map_err(|e| anyhow!("invalid recipient {}: {e}", email.to))?;
    let builder = Message::builder()
        .from(from.clone())
        .to(to)
        .subject(email.subject.clone());
    let msg = match &email.html {
        Some(html) => builder.multipart(MultiPart::alternative_plain_html(
            email.text.clone(),
            html.clone(),
        )),
        None => builder.singlepart(SinglePart::plain(email.text.clone())),
    };
    msg.context("build email")
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let msg = build_message(&self.from, email)?;
        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }
    fn name(&self) -> &'static str {
        "smtp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipart_when_html_present() {
        let from: Mailbox = "Watchers <alerts@example.com>".parse().unwrap();
        let email = OutgoingEmail {
            to: "user@example.com".into(),
            subject: "Watcher update: Rust".into(),
            text: "hello".into(),
            html: Some("<p>hello</p>".into()),
        };
        let raw = String::from_utf8(build_message(&from, &email).unwrap().formatted()).unwrap();
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("Subject: Watcher update: Rust"));
    }

    #[test]
    fn bad_recipient_is_an_error() {
        let from: Mailbox = "alerts@example.com".parse().unwrap();
        let email = OutgoingEmail {
            to: "not an address".into(),
            subject: "s".into(),
            text: "t".into(),
            html: None,
        };
        assert!(build_message(&from, &email).is_err());
    }
}
