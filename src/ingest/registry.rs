// src/ingest/registry.rs
use std::sync::Arc;

use crate::ingest::http::HttpFetcher;
use crate::ingest::providers::{
    finnhub::FinnhubStocksProvider,
    job_boards::{ArbeitnowProvider, RemoteOkProvider, RemotiveProvider},
    reddit::RedditProvider,
    serpapi::{SerpApiProvider, SerpEngine},
    UnconfiguredProvider,
};
use crate::ingest::types::Provider;

/// Lookup-by-id table of providers. Registration order is the default query order.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full production catalog.
    pub fn with_defaults(http: HttpFetcher) -> Self {
        let mut reg = Self::new();
        for engine in SerpEngine::ALL {
            reg.register(SerpApiProvider::new(engine, http.clone()));
        }
        reg.register(FinnhubStocksProvider::new(http.clone()));
        reg.register(RemotiveProvider::new(http.clone()));
        reg.register(RemoteOkProvider::new(http.clone()));
        reg.register(ArbeitnowProvider::new(http.clone()));
        reg.register(RedditProvider::new(http));
        for (id, label) in [
            ("linkedin", "LinkedIn"),
            ("indeed", "Indeed"),
            ("zillow", "Zillow"),
            ("redfin", "Redfin"),
        ] {
            reg.register(UnconfiguredProvider::new(id, label));
        }
        reg
    }

    /// Add a provider; a later registration with the same id replaces the earlier one in place.
    pub fn register<P: Provider + 'static>(&mut self, provider: P) -> &mut Self {
        self.register_arc(Arc::new(provider))
    }

    pub fn register_arc(&mut self, provider: Arc<dyn Provider>) -> &mut Self {
        match self.providers.iter().position(|p| p.id() == provider.id()) {
            Some(i) => self.providers[i] = provider,
            None => self.providers.push(provider),
        }
        self
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Provider>> {
        self.providers.iter().find(|p| p.id() == id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.providers.iter().any(|p| p.id() == id)
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
