// src/config/runner.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PATH: &str = "WATCHER_CONFIG_PATH";

fn default_digest_hour() -> u32 {
    9
}
fn default_utc_offset() -> i32 {
    -8 * 60
}
fn default_provider_timeout() -> u64 {
    15
}
fn default_queue_capacity() -> usize {
    crate::notify::queue::DEFAULT_QUEUE_CAPACITY
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunnerConfig {
    /// Bearer secret for the HTTP trigger. Unset → trigger refuses to run.
    #[serde(default)]
    pub cron_secret: Option<String>,
    /// Local hour (0–23) at which the daily digest goes out.
    #[serde(default = "default_digest_hour")]
    pub digest_hour: u32,
    /// Fixed offset of the digest clock from UTC, in minutes.
    #[serde(default = "default_utc_offset")]
    pub digest_utc_offset_minutes: i32,
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_secs: u64,
    /// In-process trigger period; 0 disables it.
    #[serde(default)]
    pub schedule_secs: u64,
    #[serde(default = "default_queue_capacity")]
    pub notify_queue_capacity: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            cron_secret: None,
            digest_hour: default_digest_hour(),
            digest_utc_offset_minutes: default_utc_offset(),
            provider_timeout_secs: default_provider_timeout(),
            schedule_secs: 0,
            notify_queue_capacity: default_queue_capacity(),
        }
    }
}

impl RunnerConfig {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading runner config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        parse(&content, &ext)
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $WATCHER_CONFIG_PATH
    /// 2) config/runner.toml
    /// 3) config/runner.json
    /// 4) defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("WATCHER_CONFIG_PATH points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else if Path::new("config/runner.toml").exists() {
            Self::load_from(Path::new("config/runner.toml"))?
        } else if Path::new("config/runner.json").exists() {
            Self::load_from(Path::new("config/runner.json"))?
        } else {
            Self::default()
        };
        cfg.apply_env()?;
        Ok(cfg.sanitized())
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(v) = env_nonempty("WATCHER_CRON_SECRET") {
            self.cron_secret = Some(v);
        }
        if let Some(v) = env_nonempty("DIGEST_HOUR") {
            self.digest_hour = v.parse().context("invalid DIGEST_HOUR")?;
        }
        if let Some(v) = env_nonempty("DIGEST_UTC_OFFSET_MINUTES") {
            self.digest_utc_offset_minutes = v.parse().context("invalid DIGEST_UTC_OFFSET_MINUTES")?;
        }
        if let Some(v) = env_nonempty("PROVIDER_TIMEOUT_SECS") {
            self.provider_timeout_secs = v.parse().context("invalid PROVIDER_TIMEOUT_SECS")?;
        }
        if let Some(v) = env_nonempty("WATCHER_SCHEDULE_SECS") {
            self.schedule_secs = v.parse().context("invalid WATCHER_SCHEDULE_SECS")?;
        }
        Ok(())
    }

    /// Clamp out-of-range values back to defaults.
    pub fn sanitized(mut self) -> Self {
        if self.digest_hour > 23 {
            self.digest_hour = default_digest_hour();
        }
        if self.digest_utc_offset_minutes.abs() > 14 * 60 {
            self.digest_utc_offset_minutes = default_utc_offset();
        }
        if self.provider_timeout_secs == 0 {
            self.provider_timeout_secs = 1;
        }
        if self.notify_queue_capacity == 0 {
            self.notify_queue_capacity = default_queue_capacity();
        }
        self.cron_secret = self
            .cron_secret
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse(s: &str, hint_ext: &str) -> Result<RunnerConfig> {
    if hint_ext == "json" {
        return serde_json::from_str(s).context("parsing runner config as JSON");
    }
    match toml::from_str::<RunnerConfig>(s) {
        Ok(cfg) => Ok(cfg),
        Err(toml_err) => serde_json::from_str(s)
            .map_err(|_| anyhow!("unsupported runner config format: {toml_err}")),
    }
}
