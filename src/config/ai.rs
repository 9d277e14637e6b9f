// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";

fn default_provider() -> String {
    "azure_openai".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_timeout_secs() -> u64 {
    20
}
fn default_max_completion_tokens() -> u32 {
    800
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub enabled: bool,
    /// "azure_openai" (case-insensitive); anything else disables generation.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// "ENV" means: read from AZURE_OPENAI_API_KEY.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    /// Upper bound for a single completion call; callers fall back on expiry.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_completion_tokens")]
    pub max_completion_tokens: u32,
    /// Let the model pick the search engine/query for search-backed categories.
    #[serde(default = "default_true")]
    pub plan_searches: bool,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            api_key: default_api_key(),
            timeout_secs: default_timeout_secs(),
            max_completion_tokens: default_max_completion_tokens(),
            plan_searches: true,
        }
    }
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut cfg: AiConfig = serde_json::from_str(&data)?;

        cfg.provider = cfg.provider.trim().to_lowercase();

        if cfg.enabled && cfg.api_key.trim().eq_ignore_ascii_case("env") {
            cfg.api_key = match cfg.provider.as_str() {
                "azure_openai" => env::var("AZURE_OPENAI_API_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing AZURE_OPENAI_API_KEY env var"))?,
                other => anyhow::bail!("Unsupported provider in config: {other}"),
            };
        }

        if cfg.timeout_secs == 0 {
            cfg.timeout_secs = default_timeout_secs();
        }
        if cfg.max_completion_tokens == 0 {
            cfg.max_completion_tokens = default_max_completion_tokens();
        }

        Ok(cfg)
    }

    /// `config/ai.json` if present and valid, else a disabled config.
    pub fn load_default() -> Self {
        let path = Path::new(DEFAULT_AI_CONFIG_PATH);
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from_file(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, "AI config unusable; text generation disabled");
                Self::default()
            }
        }
    }
}
