// src/ingest/providers/finnhub.rs
//! Upcoming-earnings reminders for tickers named in a watcher's keywords.

use std::collections::BTreeSet;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Deserialize;

use crate::ingest::http::{url_with_params, HttpFetcher};
use crate::ingest::types::{Provider, ProviderOutcome, ProviderQuery};
use crate::model::CandidateItem;

const ENV_API_KEY: &str = "FINNHUB_API_KEY";
const API_BASE: &str = "https://finnhub.io/api/v1";

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    c: f64,
    #[serde(default)]
    dp: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct EarningsCalendar {
    #[serde(default, rename = "earningsCalendar")]
    earnings_calendar: Vec<EarningsEntry>,
}

#[derive(Debug, Deserialize)]
struct EarningsEntry {
    date: String,
    #[serde(default, rename = "epsEstimate")]
    eps_estimate: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct NewsItem {
    headline: String,
    #[serde(default)]
    source: Option<String>,
}

/// Distinct upper-case ticker-like tokens (1–10 chars of `A-Z . -`), first-seen order.
pub fn extract_tickers(keywords: &[String]) -> Vec<String> {
    static RE_SPLIT: OnceCell<Regex> = OnceCell::new();
    static RE_TICKER: OnceCell<Regex> = OnceCell::new();
    let split = RE_SPLIT.get_or_init(|| Regex::new(r"[^A-Za-z.\-]+").expect("ticker split regex"));
    let ticker = RE_TICKER.get_or_init(|| Regex::new(r"^[A-Z.\-]{1,10}$").expect("ticker regex"));

    let combined = keywords.join(" ");
    let mut seen = BTreeSet::new();
    split
        .split(&combined)
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_uppercase())
        .filter(|t| ticker.is_match(t))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

fn format_price(v: f64) -> String {
    if v.is_finite() {
        format!("${v:.2}")
    } else {
        "N/A".to_string()
    }
}

fn format_percent(v: f64) -> String {
    let sign = if v > 0.0 { "+" } else { "" };
    format!("{sign}{v:.2}%")
}

pub struct FinnhubStocksProvider {
    http: HttpFetcher,
    api_key: Option<String>,
}

impl FinnhubStocksProvider {
    pub const ID: &'static str = "finnhub_stocks";

    pub fn new(http: HttpFetcher) -> Self {
        let api_key = std::env::var(ENV_API_KEY).ok().filter(|k| !k.trim().is_empty());
        Self { http, api_key }
    }

    fn key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| anyhow!("Missing required environment variable: {ENV_API_KEY}"))
    }

    async fn symbol_item(&self, symbol: &str, today: NaiveDate) -> Result<Option<CandidateItem>> {
        let key = self.key()?;
        let from = today.format("%Y-%m-%d").to_string();
        let earnings_to = (today + Duration::days(90)).format("%Y-%m-%d").to_string();
        let news_to = (today + Duration::days(7)).format("%Y-%m-%d").to_string();

        let quote_url = url_with_params(&format!("{API_BASE}/quote"), &[("symbol", symbol), ("token", key)])?;
        let earnings_url = url_with_params(
            &format!("{API_BASE}/calendar/earnings"),
            &[("symbol", symbol), ("from", from.as_str()), ("to", earnings_to.as_str()), ("token", key)],
        )?;
        let news_url = url_with_params(
            &format!("{API_BASE}/company-news"),
            &[("symbol", symbol), ("from", from.as_str()), ("to", news_to.as_str()), ("token", key)],
        )?;

        let (quote, earnings, news) = tokio::try_join!(
            self.http.get_json::<Quote>(&quote_url),
            self.http.get_json::<EarningsCalendar>(&earnings_url),
            self.http.get_json::<Vec<NewsItem>>(&news_url),
        )?;

        // ISO dates compare correctly as strings.
        let mut upcoming: Vec<EarningsEntry> = earnings
            .earnings_calendar
            .into_iter()
            .filter(|e| e.date.as_str() >= from.as_str())
            .collect();
        upcoming.sort_by(|a, b| a.date.cmp(&b.date));
        let Some(next) = upcoming.into_iter().next() else {
            return Ok(None);
        };

        let price_line = format!(
            "{}: {} ({})",
            symbol,
            format_price(quote.c),
            format_percent(quote.dp.unwrap_or(0.0))
        );
        let earnings_line = match next.eps_estimate {
            Some(eps) if eps != 0.0 => format!("Earnings date: {} (EPS est. {})", next.date, eps),
            _ => format!("Earnings date: {}", next.date),
        };
        let top_news: Vec<String> = news
            .iter()
            .take(3)
            .map(|n| match n.source.as_deref().filter(|s| !s.is_empty()) {
                Some(src) => format!("- {} ({})", n.headline, src),
                None => format!("- {}", n.headline),
            })
            .collect();

        let mut description = vec![earnings_line];
        if !top_news.is_empty() {
            description.push("Top news:".to_string());
            description.extend(top_news);
        }

        Ok(Some(CandidateItem {
            title: price_line,
            description: Some(description.join("\n")),
            url: Some(format!("https://finance.yahoo.com/quote/{symbol}")),
            matched_keywords: Some(vec![symbol.to_string()]),
        }))
    }
}

#[async_trait]
impl Provider for FinnhubStocksProvider {
    fn id(&self) -> &'static str {
        Self::ID
    }
    fn label(&self) -> &'static str {
        "Finnhub Stocks"
    }
    async fn run(&self, query: &ProviderQuery) -> ProviderOutcome {
        let tickers = extract_tickers(&query.keywords);
        if tickers.is_empty() {
            return ProviderOutcome::failed(Self::ID, "No valid stock tickers provided");
        }
        if let Err(e) = self.key() {
            return ProviderOutcome::failed(Self::ID, e.to_string());
        }

        let today = Utc::now().date_naive();
        let mut items = Vec::new();
        for symbol in &tickers {
            match self.symbol_item(symbol, today).await {
                Ok(Some(item)) => items.push(item),
                Ok(None) => {}
                // A failing symbol is skipped; the others still report.
                Err(e) => tracing::debug!(target: "providers", %symbol, error = %e, "finnhub symbol skipped"),
            }
        }
        ProviderOutcome::fetched(Self::ID, "Fetched upcoming earnings reminders", items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tickers_are_uppercased_and_distinct() {
        let kws = vec!["aapl, msft".to_string(), "AAPL brk.b".to_string(), "12345".to_string()];
        assert_eq!(extract_tickers(&kws), vec!["AAPL", "MSFT", "BRK.B"]);
    }

    #[test]
    fn percent_has_explicit_plus() {
        assert_eq!(format_percent(1.234), "+1.23%");
        assert_eq!(format_percent(-0.5), "-0.50%");
        assert_eq!(format_price(f64::NAN), "N/A");
    }

    #[tokio::test]
    async fn no_tickers_reports_failure() {
        let p = FinnhubStocksProvider {
            http: HttpFetcher::default(),
            api_key: Some("k".into()),
        };
        let out = p.run(&ProviderQuery::new(vec!["123".into()], Default::default())).await;
        assert!(!out.ok);
        assert!(out.items.is_empty());
    }
}
