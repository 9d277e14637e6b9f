// src/textgen/azure.rs
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use super::{Completion, TextGenerator};
use crate::config::ai::AiConfig;
use crate::ingest::http::required_env;

/// Azure OpenAI chat completions (deployment-scoped endpoint, `api-key` header).
pub struct AzureOpenAiClient {
    http: reqwest::Client,
    endpoint: String,
    deployment: String,
    api_version: String,
    api_key: String,
    max_completion_tokens: u32,
}

impl AzureOpenAiClient {
    /// Requires AZURE_OPENAI_ENDPOINT, AZURE_OPENAI_DEPLOYMENT, AZURE_OPENAI_API_VERSION
    /// and an API key (config or AZURE_OPENAI_API_KEY).
    pub fn from_env(cfg: &AiConfig) -> anyhow::Result<Self> {
        let api_key = if cfg.api_key.trim().is_empty() || cfg.api_key.eq_ignore_ascii_case("env") {
            required_env("AZURE_OPENAI_API_KEY")?
        } else {
            cfg.api_key.clone()
        };
        let http = reqwest::Client::builder()
            .user_agent("watcher-alerts/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
            .build()
            .context("building reqwest client")?;
        Ok(Self {
            http,
            endpoint: required_env("AZURE_OPENAI_ENDPOINT")?,
            deployment: required_env("AZURE_OPENAI_DEPLOYMENT")?,
            api_version: required_env("AZURE_OPENAI_API_VERSION")?,
            api_key,
            max_completion_tokens: cfg.max_completion_tokens,
        })
    }

    pub fn url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }

    async fn complete_impl(&self, req: &Completion) -> anyhow::Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Format {
            #[serde(rename = "type")]
            kind: &'static str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_completion_tokens: u32,
            #[serde(skip_serializing_if = "Option::is_none")]
            response_format: Option<Format>,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: Option<ChoiceMsg>,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: Option<String>,
        }

        let body = Req {
            messages: vec![
                Msg {
                    role: "system",
                    content: &req.system,
                },
                Msg {
                    role: "user",
                    content: &req.user,
                },
            ],
            temperature: 1.0,
            max_completion_tokens: self.max_completion_tokens,
            response_format: req.json.then_some(Format {
                kind: "json_object",
            }),
        };

        let resp = self
            .http
            .post(self.url())
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("Azure OpenAI request")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Azure OpenAI request failed ({status}): {text}");
        }

        let parsed: Resp = resp.json().await.context("decoding Azure OpenAI response")?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("Azure OpenAI response missing content"))
    }
}

impl TextGenerator for AzureOpenAiClient {
    fn complete<'a>(
        &'a self,
        req: &'a Completion,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        Box::pin(self.complete_impl(req))
    }
    fn provider_name(&self) -> &'static str {
        "azure_openai"
    }
}
