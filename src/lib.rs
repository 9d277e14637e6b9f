// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod digest;
pub mod due;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod notify;
pub mod runner;
pub mod scheduler;
pub mod store;
pub mod textgen;

pub use crate::api::create_router;
pub use crate::runner::{RunOptions, RunReport, Runner};

use crate::config::{AiConfig, RunnerConfig};
use crate::ingest::{http::HttpFetcher, ProviderRegistry};
use crate::textgen::TextGen;

/// Wire a production runner from config files and the environment.
pub fn build_runner_from_env() -> anyhow::Result<Runner> {
    let cfg = RunnerConfig::load_default()?;
    let ai = AiConfig::load_default();
    let textgen = TextGen::from_config(&ai);
    tracing::info!(
        textgen = textgen.client.provider_name(),
        provider_timeout_secs = cfg.provider_timeout_secs,
        digest_hour = cfg.digest_hour,
        "runner configured"
    );
    let registry = ProviderRegistry::with_defaults(HttpFetcher::new(cfg.provider_timeout()));
    Ok(Runner::new(
        store::store_from_env(),
        registry,
        textgen,
        notify::mailer_from_env()?,
        cfg,
    ))
}

/// Install an `fmt` subscriber filtered by `RUST_LOG` (compact, or JSON when
/// `LOG_FORMAT=json`). Safe to call twice.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("watcher_alerts=info,warn"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}
