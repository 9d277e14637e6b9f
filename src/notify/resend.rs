// src/notify/resend.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;

use super::{Mailer, OutgoingEmail};

const RESEND_URL: &str = "https://api.resend.com/emails";

/// Resend HTTP API transport.
pub struct ResendMailer {
    http: reqwest::Client,
    api_key: String,
    from: String,
    endpoint: String,
}

#[derive(Serialize)]
struct SendBody<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<&'a str>,
}

impl ResendMailer {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_key: api_key.into(),
            from: from.into(),
            endpoint: RESEND_URL.to_string(),
        }
    }

    /// `None` unless both RESEND_API_KEY and RESEND_FROM are set.
    pub fn from_env() -> Option<Self> {
        let key = std::env::var("RESEND_API_KEY").ok().filter(|v| !v.trim().is_empty())?;
        let from = std::env::var("RESEND_FROM").ok().filter(|v| !v.trim().is_empty())?;
        Some(Self::new(key, from))
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let body = SendBody {
            from: &self.from,
            to: [&email.to],
            subject: &email.subject,
            text: &email.text,
            html: email.html.as_deref(),
        };
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("resend request")?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("resend returned {status}: {text}");
        }
        Ok(())
    }
    fn name(&self) -> &'static str {
        "resend"
    }
}
