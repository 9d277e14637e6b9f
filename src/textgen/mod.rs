//! Text generation: a small completion abstraction with a real Azure OpenAI
//! backend, a disabled client and a deterministic mock.
//!
//! Callers never depend on a completion succeeding; `synth` wraps every call
//! with a timeout and a deterministic fallback.

pub mod azure;
pub mod synth;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;

use crate::config::ai::AiConfig;

pub use azure::AzureOpenAiClient;

/// One chat-style completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub system: String,
    pub user: String,
    /// Ask the backend for a JSON object reply.
    pub json: bool,
}

impl Completion {
    pub fn text(user: impl Into<String>) -> Self {
        Self {
            system: "You output plain text only.".to_string(),
            user: user.into(),
            json: false,
        }
    }

    pub fn json(user: impl Into<String>) -> Self {
        Self {
            system: "You output strict JSON only.".to_string(),
            user: user.into(),
            json: true,
        }
    }
}

pub trait TextGenerator: Send + Sync {
    fn complete<'a>(
        &'a self,
        req: &'a Completion,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>>;
    /// Backend name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynTextGen = Arc<dyn TextGenerator>;

/// Runtime handle: the generator plus the knobs callers need.
#[derive(Clone)]
pub struct TextGen {
    pub client: DynTextGen,
    pub timeout: Duration,
    pub plan_searches: bool,
}

impl TextGen {
    pub fn new(client: DynTextGen, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            plan_searches: true,
        }
    }

    pub fn disabled() -> Self {
        Self::new(Arc::new(DisabledClient), Duration::from_secs(1))
    }

    pub fn from_config(cfg: &AiConfig) -> Self {
        Self {
            client: build_client_from_config(cfg),
            timeout: Duration::from_secs(cfg.timeout_secs.max(1)),
            plan_searches: cfg.plan_searches,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.provider_name() != "disabled"
    }

    /// Completion bounded by `self.timeout`; the reply is trimmed and must be non-empty.
    pub async fn complete(&self, req: &Completion) -> anyhow::Result<String> {
        let reply = tokio::time::timeout(self.timeout, self.client.complete(req))
            .await
            .map_err(|_| anyhow!("text generation timed out after {:?}", self.timeout))??;
        let reply = reply.trim();
        if reply.is_empty() {
            anyhow::bail!("empty completion");
        }
        Ok(reply.to_string())
    }
}

/// Factory: build a client according to config and environment variables.
///
/// * `AI_TEST_MODE=mock` → deterministic mock client.
/// * `enabled == false` → disabled client.
/// * `azure_openai` → real client (disabled if its env is incomplete).
pub fn build_client_from_config(config: &AiConfig) -> DynTextGen {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockClient::fixed("Here is a quick summary (mock)."));
    }

    if !config.enabled {
        return Arc::new(DisabledClient);
    }

    match config.provider.as_str() {
        "azure_openai" => match AzureOpenAiClient::from_env(config) {
            Ok(c) => Arc::new(c),
            Err(e) => {
                tracing::warn!(error = %e, "Azure OpenAI not configured; text generation disabled");
                Arc::new(DisabledClient)
            }
        },
        other => {
            tracing::warn!(provider = other, "unknown text generation provider");
            Arc::new(DisabledClient)
        }
    }
}

/// Always errors; callers use their fallbacks.
pub struct DisabledClient;

impl TextGenerator for DisabledClient {
    fn complete<'a>(
        &'a self,
        _req: &'a Completion,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        Box::pin(async { Err(anyhow!("text generation disabled")) })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic client for tests/local runs: one fixed reply, or a fixed failure.
#[derive(Clone)]
pub struct MockClient {
    reply: Option<String>,
}

impl MockClient {
    pub fn fixed(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
        }
    }

    pub fn failing() -> Self {
        Self { reply: None }
    }
}

impl TextGenerator for MockClient {
    fn complete<'a>(
        &'a self,
        _req: &'a Completion,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        let out = self.reply.clone();
        Box::pin(async move { out.ok_or_else(|| anyhow!("mock failure")) })
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Drop a surrounding ```json fence some models wrap JSON replies in.
pub fn strip_code_fences(input: &str) -> &str {
    let mut s = input.trim();
    if let Some(rest) = s.strip_prefix("```") {
        s = rest;
        if s.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("json")) {
            s = &s[4..];
        }
    }
    if let Some(rest) = s.trim_end().strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fences_are_stripped() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```JSON{\"a\":1}```  "), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    #[tokio::test]
    async fn disabled_and_failing_clients_error() {
        let req = Completion::text("hi");
        assert!(TextGen::disabled().complete(&req).await.is_err());
        let failing = TextGen::new(Arc::new(MockClient::failing()), Duration::from_secs(1));
        assert!(failing.complete(&req).await.is_err());
        let blank = TextGen::new(Arc::new(MockClient::fixed("   ")), Duration::from_secs(1));
        assert!(blank.complete(&req).await.is_err());
    }

    #[serial_test::serial]
    #[test]
    fn mock_mode_wins_over_disabled_config() {
        std::env::set_var("AI_TEST_MODE", "mock");
        let client = build_client_from_config(&AiConfig::default());
        std::env::remove_var("AI_TEST_MODE");
        assert_eq!(client.provider_name(), "mock");
        assert_eq!(build_client_from_config(&AiConfig::default()).provider_name(), "disabled");
    }
}
