// src/ingest/mod.rs
//! Provider plumbing: selection, concurrent fan-out, dedup and ranking.

pub mod dedup;
pub mod fanout;
pub mod http;
pub mod matching;
pub mod providers;
pub mod rank;
pub mod registry;
pub mod sources;
pub mod types;

use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

pub use fanout::{fan_out, FanOut, ProviderTrace};
pub use registry::ProviderRegistry;
pub use types::{Provider, ProviderOutcome, ProviderQuery};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "provider_errors_total",
            "Provider calls that failed, timed out or were unknown."
        );
        describe_histogram!("provider_call_ms", "Provider call latency in milliseconds.");
    });
}
