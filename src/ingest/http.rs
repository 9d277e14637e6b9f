// src/ingest/http.rs
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;

const USER_AGENT: &str = "watcher-alerts/0.1 (post monitoring bot)";

/// Shared JSON fetcher for providers. Every request carries a hard timeout.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(4))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `url` and decode the body as JSON. Non-2xx responses become errors
    /// carrying the status and body text.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("GET {}", redact(url)))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("HTTP {}: {}", status.as_u16(), truncate(&text, 300));
        }
        resp.json::<T>()
            .await
            .with_context(|| format!("decoding JSON from {}", redact(url)))
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(15))
    }
}

/// Read a required env var, failing with the variable's name.
pub fn required_env(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("Missing required environment variable: {name}"))
}

/// Build `base?k=v&...` with proper encoding.
pub fn url_with_params(base: &str, params: &[(&str, &str)]) -> Result<String> {
    let url = reqwest::Url::parse_with_params(base, params)
        .with_context(|| format!("building url for {base}"))?;
    Ok(url.to_string())
}

// Never log API keys/tokens that ride in query strings.
fn redact(url: &str) -> String {
    match url.split_once('?') {
        Some((base, _)) => format!("{base}?…"),
        None => url.to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
