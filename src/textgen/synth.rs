// src/textgen/synth.rs
//! Prompt builders and the generated pieces of each email, each with a
//! deterministic fallback used whenever generation fails, times out or is disabled.

use serde::Deserialize;
use serde_json::Value;

use super::{strip_code_fences, Completion, TextGen};
use crate::ingest::providers::serpapi::SerpEngine;
use crate::model::{Category, Filters, SourcedItem, Watcher};

const PROMPT_SAMPLE: usize = 5;

// ---- search planning ----

/// Engine + query proposed for a search-backed watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPlan {
    pub engine: SerpEngine,
    pub query: String,
    pub location: Option<String>,
}

impl SearchPlan {
    /// Write the plan into a run-local filter copy.
    pub fn apply(&self, filters: &mut Filters) {
        filters.insert(
            "serpapiEngine".into(),
            Value::String(self.engine.engine_name().to_string()),
        );
        filters.insert("serpapiQuery".into(), Value::String(self.query.clone()));
        if let Some(loc) = &self.location {
            filters.insert("serpapiLocation".into(), Value::String(loc.clone()));
        }
    }
}

fn search_plan_prompt(watcher: &Watcher) -> String {
    [
        "Decide which SerpApi Google engine to use for this watcher.".to_string(),
        "Use ONLY one of: google_jobs, google_shopping, google_news.".to_string(),
        "Return JSON with: engine, query, and optional location.".to_string(),
        "Choose based on category and keywords.".to_string(),
        format!("Watcher name: {}", watcher.name),
        format!("Category: {}", watcher.category),
        format!("Keywords: {}", watcher.keywords.join(", ")),
        format!("Filters: {}", Value::Object(watcher.filters.clone())),
    ]
    .join("\n")
}

/// Strictly validate a plan reply: known engine, non-empty query.
pub fn parse_search_plan(reply: &str) -> anyhow::Result<SearchPlan> {
    #[derive(Deserialize)]
    struct Raw {
        engine: String,
        query: String,
        #[serde(default)]
        location: Option<String>,
    }
    let raw: Raw = serde_json::from_str(strip_code_fences(reply))?;
    let engine = SerpEngine::from_engine_name(raw.engine.trim())
        .ok_or_else(|| anyhow::anyhow!("unsupported engine: {}", raw.engine))?;
    let query = raw.query.trim();
    if query.is_empty() {
        anyhow::bail!("empty query in search plan");
    }
    Ok(SearchPlan {
        engine,
        query: query.to_string(),
        location: raw
            .location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty()),
    })
}

/// `None` when planning is off, not applicable, or the reply is unusable.
pub async fn search_plan(tg: &TextGen, watcher: &Watcher) -> Option<SearchPlan> {
    if !tg.plan_searches || !tg.is_enabled() {
        return None;
    }
    if !matches!(
        watcher.category,
        Category::Jobs | Category::Shopping | Category::News | Category::RealEstate
    ) {
        return None;
    }
    let res = tg
        .complete(&Completion::json(search_plan_prompt(watcher)))
        .await
        .and_then(|reply| parse_search_plan(&reply));
    match res {
        Ok(plan) => Some(plan),
        Err(e) => {
            tracing::warn!(target: "textgen", watcher_id = %watcher.id, error = %e, "search plan unavailable");
            None
        }
    }
}

// ---- immediate notification ----

pub fn intro_fallback(category: Category, count: usize) -> String {
    if category == Category::Stocks {
        "Here is your daily market brief.".to_string()
    } else {
        format!("Here are the top {count} matches we found for you.")
    }
}

/// 1–2 sentence intro for a non-stock notification.
pub async fn notification_intro(tg: &TextGen, watcher: &Watcher, items: &[SourcedItem]) -> String {
    let titles: Vec<&str> = items.iter().take(PROMPT_SAMPLE).map(|i| i.title.as_str()).collect();
    let prompt = [
        "Write a short, friendly 1-2 sentence intro for an alert email.".to_string(),
        "Keep it concise and upbeat. No markdown.".to_string(),
        format!("Watcher: {}", watcher.name),
        format!("Sample items: {}", titles.join(", ")),
    ]
    .join("\n");
    tg.complete(&Completion::text(prompt))
        .await
        .unwrap_or_else(|e| {
            tracing::debug!(target: "textgen", error = %e, "intro fallback");
            intro_fallback(watcher.category, items.len())
        })
}

/// One stock item split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLine {
    pub symbol: String,
    pub price_line: String,
    pub earnings_line: Option<String>,
    pub headlines: Vec<String>,
}

impl StockLine {
    /// Symbol = title before `:`; earnings = line starting `Earnings date:`;
    /// headlines = non-empty lines after `Top news:`.
    pub fn from_item(item: &SourcedItem) -> Self {
        let symbol = item
            .title
            .split(':')
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("UNKNOWN")
            .to_string();
        let lines: Vec<&str> = item.description.as_deref().unwrap_or("").lines().collect();
        let starts = |line: &str, prefix: &str| line.trim().to_lowercase().starts_with(prefix);
        let earnings_line = lines
            .iter()
            .find(|l| starts(l, "earnings date:"))
            .map(|l| l.trim().to_string());
        let headlines = lines
            .iter()
            .position(|l| starts(l, "top news:"))
            .map(|i| {
                lines[i + 1..]
                    .iter()
                    .map(|l| l.trim())
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self {
            symbol,
            price_line: item.title.clone(),
            earnings_line,
            headlines,
        }
    }

    fn news(&self) -> String {
        self.headlines.iter().take(3).cloned().collect::<Vec<_>>().join(" | ")
    }

    fn earnings(&self) -> &str {
        self.earnings_line.as_deref().unwrap_or("Earnings: unknown")
    }
}

pub fn stock_briefing_fallback(watcher_name: &str, lines: &[StockLine]) -> String {
    let mut out = vec![format!("Morning brief for {watcher_name}:")];
    for l in lines {
        let news = l.news();
        let mut row = format!("{} - {}. {}.", l.symbol, l.price_line, l.earnings());
        if !news.is_empty() {
            row.push_str(&format!(" News: {news}."));
        }
        out.push(row);
    }
    out.join("\n")
}

/// Neutral per-symbol morning brief (no advice).
pub async fn stock_briefing(tg: &TextGen, watcher: &Watcher, items: &[SourcedItem]) -> String {
    let lines: Vec<StockLine> = items.iter().map(StockLine::from_item).collect();
    let mut prompt = vec![
        "You are a neutral market briefing assistant.".to_string(),
        "Write a short morning brief with a 2-3 sentence overview, then 1 short paragraph per symbol.".to_string(),
        "Do NOT give buy/sell/hold advice or price targets.".to_string(),
        "Mention price moves, upcoming earnings, and notable headlines.".to_string(),
        "Keep it concise and readable. Plain text only.".to_string(),
        format!("Watcher: {}", watcher.name),
        "Items:".to_string(),
    ];
    prompt.extend(
        lines
            .iter()
            .map(|l| format!("- {}: {}; {}; News: {}", l.symbol, l.price_line, l.earnings(), l.news())),
    );
    tg.complete(&Completion::text(prompt.join("\n")))
        .await
        .unwrap_or_else(|e| {
            tracing::debug!(target: "textgen", error = %e, "briefing fallback");
            stock_briefing_fallback(&watcher.name, &lines)
        })
}

// ---- daily digest ----

pub async fn watcher_section_summary(tg: &TextGen, watcher_name: &str, titles: &[String]) -> String {
    let mut prompt = vec![
        "Write one short sentence summarizing updates for this watcher.".to_string(),
        "Be concise and factual. No advice.".to_string(),
        format!("Watcher: {watcher_name}"),
        "Items:".to_string(),
    ];
    prompt.extend(titles.iter().take(PROMPT_SAMPLE).map(|t| format!("- {t}")));
    tg.complete(&Completion::text(prompt.join("\n")))
        .await
        .unwrap_or_else(|_| format!("{watcher_name} has {} updates.", titles.len()))
}

/// (watcher name, item titles) per group.
pub async fn daily_digest_summary(tg: &TextGen, date_label: &str, groups: &[(String, Vec<String>)]) -> String {
    let mut prompt = vec![
        "You are a concise daily digest assistant.".to_string(),
        "Summarize today's updates across all watchers in 3-5 sentences.".to_string(),
        "Do NOT give advice; keep it neutral and factual.".to_string(),
        format!("Date: {date_label}"),
        "Items:".to_string(),
    ];
    for (name, titles) in groups {
        prompt.push(format!("Watcher: {name}"));
        prompt.extend(titles.iter().take(PROMPT_SAMPLE).map(|t| format!("- {t}")));
    }
    tg.complete(&Completion::text(prompt.join("\n")))
        .await
        .unwrap_or_else(|_| {
            format!(
                "Daily digest for {date_label}. {} watcher(s) had updates.",
                groups.len()
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::textgen::MockClient;
    use std::sync::Arc;
    use std::time::Duration;

    fn stock(title: &str, desc: &str) -> SourcedItem {
        SourcedItem {
            source: "finnhub_stocks".into(),
            title: title.into(),
            description: Some(desc.into()),
            url: None,
            matched_keywords: vec![],
        }
    }

    #[test]
    fn stock_line_parts() {
        let l = StockLine::from_item(&stock(
            "AAPL: $190.00 (+1.20%)",
            "Earnings date: 2026-10-30\nTop news:\nApple ships thing\n\nSupplier beats",
        ));
        assert_eq!(l.symbol, "AAPL");
        assert_eq!(l.earnings_line.as_deref(), Some("Earnings date: 2026-10-30"));
        assert_eq!(l.headlines, vec!["Apple ships thing", "Supplier beats"]);
    }

    #[test]
    fn plan_validation() {
        let p = parse_search_plan("```json\n{\"engine\":\"google_news\",\"query\":\" rust \",\"location\":\"\"}\n```").unwrap();
        assert_eq!(p.engine, SerpEngine::GoogleNews);
        assert_eq!(p.query, "rust");
        assert_eq!(p.location, None);
        assert!(parse_search_plan(r#"{"engine":"bing","query":"x"}"#).is_err());
        assert!(parse_search_plan(r#"{"engine":"google_jobs","query":"  "}"#).is_err());
        assert!(parse_search_plan("not json").is_err());
    }

    #[tokio::test]
    async fn fallbacks_when_generation_fails() {
        let tg = TextGen::new(Arc::new(MockClient::failing()), Duration::from_secs(1));
        let w = Watcher::new("w1", "u1", "Portfolio", Category::Stocks, vec![]);
        let items = vec![stock("MSFT: $400.00 (-0.50%)", "Top news:\nAzure grows")];
        let brief = stock_briefing(&tg, &w, &items).await;
        assert_eq!(
            brief,
            "Morning brief for Portfolio:\nMSFT - MSFT: $400.00 (-0.50%). Earnings: unknown. News: Azure grows."
        );
        let titles = vec!["a".to_string(), "b".to_string()];
        assert_eq!(watcher_section_summary(&tg, "Jobs", &titles).await, "Jobs has 2 updates.");
        assert_eq!(
            daily_digest_summary(&tg, "Oct 19, 2026", &[("Jobs".into(), titles)]).await,
            "Daily digest for Oct 19, 2026. 1 watcher(s) had updates."
        );
        let jobs = Watcher::new("w2", "u1", "Rust", Category::Jobs, vec![]);
        assert_eq!(
            notification_intro(&tg, &jobs, &items).await,
            "Here are the top 1 matches we found for you."
        );
    }

    #[tokio::test]
    async fn plan_skipped_for_stocks_and_disabled() {
        let tg = TextGen::new(
            Arc::new(MockClient::fixed(r#"{"engine":"google_jobs","query":"rust"}"#)),
            Duration::from_secs(1),
        );
        let stocks = Watcher::new("w", "u", "S", Category::Stocks, vec![]);
        assert!(search_plan(&tg, &stocks).await.is_none());
        let jobs = Watcher::new("w", "u", "J", Category::Jobs, vec!["rust".into()]);
        let plan = search_plan(&tg, &jobs).await.unwrap();
        let mut f = Filters::new();
        plan.apply(&mut f);
        assert_eq!(f["serpapiEngine"], "google_jobs");
        assert!(search_plan(&TextGen::disabled(), &jobs).await.is_none());
    }
}
