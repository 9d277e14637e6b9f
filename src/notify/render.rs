// src/notify/render.rs
//! Email bodies: plain text lists, per-watcher HTML and the daily digest HTML.

use crate::model::{Category, SourcedItem};

const WRAP_OPEN: &str =
    r#"<div style="font-family:Arial,sans-serif;max-width:680px;margin:0 auto;padding:24px;">"#;
const FOOTER_STYLE: &str =
    "border-top:1px solid #eee;margin-top:16px;padding-top:12px;font-size:12px;color:#999;";

pub fn escape(input: &str) -> String {
    html_escape::encode_quoted_attribute(input).into_owned()
}

fn escape_multiline(input: &str) -> String {
    escape(input).replace('\n', "<br/>")
}

const TRACKING_PARAMS: [&str; 3] = ["utm_source", "utm_medium", "utm_campaign"];

/// Add a scheme when missing and drop `utm_source`/`utm_medium`/`utm_campaign`.
/// Unparseable input is returned unchanged.
pub fn clean_url(raw: &str) -> String {
    let normalized = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else if let Some(rest) = raw.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        format!("https://{raw}")
    };
    let Ok(mut url) = reqwest::Url::parse(&normalized) else {
        return raw.to_string();
    };
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !TRACKING_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    url.to_string()
}

/// Host without a leading `www.`.
pub fn domain(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(u) => u
            .host_str()
            .map(|h| h.strip_prefix("www.").unwrap_or(h).to_string())
            .unwrap_or_else(|| url.to_string()),
        Err(_) => url.to_string(),
    }
}

fn button_label(category: Category) -> &'static str {
    match category.item_label() {
        "Job" => "View job",
        "Article" => "Read article",
        "Stock" => "View stock",
        _ => "View listing",
    }
}

fn item_icon(category: Category) -> &'static str {
    match category {
        Category::Stocks => "💹",
        Category::Shopping | Category::RealEstate => "🛒",
        Category::News => "📰",
        Category::Jobs | Category::SocialMedia => "🧭",
    }
}

/// Numbered plain-text list, URL on the line after each title.
pub fn alert_text(watcher_name: &str, items: &[SourcedItem]) -> String {
    let mut lines = vec![format!("New matches for watcher \"{watcher_name}\":"), String::new()];
    for (i, item) in items.iter().enumerate() {
        let label = format!("{}. {}", i + 1, item.title);
        match &item.url {
            Some(url) => lines.push(format!("{label}\n{url}")),
            None => lines.push(label),
        }
    }
    lines.join("\n")
}

pub struct AlertEmail<'a> {
    pub watcher_name: &'a str,
    pub category: Category,
    pub intro: &'a str,
    pub briefing: Option<&'a str>,
    pub items: &'a [SourcedItem],
}

impl AlertEmail<'_> {
    pub fn text(&self) -> String {
        let list = alert_text(self.watcher_name, self.items);
        match self.briefing {
            Some(b) => format!("{}\n\n{}\n\n{}", self.intro, b, list),
            None => list,
        }
    }

    pub fn html(&self) -> String {
        let header_title = if self.category == Category::Stocks {
            "📈 Market Briefing"
        } else {
            "Watcher update"
        };
        let mut out = String::with_capacity(4096);
        out.push_str(WRAP_OPEN);
        out.push_str(&format!(
            r#"<div style="border-bottom:1px solid #eee;padding-bottom:16px;margin-bottom:16px;"><div style="font-size:20px;font-weight:700;color:#111;">{}</div><div style="font-size:14px;color:#666;">{}</div></div>"#,
            escape(header_title),
            escape(self.watcher_name)
        ));
        out.push_str(&format!(
            r#"<p style="font-size:14px;color:#333;line-height:1.5;">{}</p>"#,
            escape(self.intro)
        ));
        if let Some(b) = self.briefing {
            out.push_str(&format!(
                r#"<div style="margin:16px 0;padding:14px 16px;background:#f8fafc;border:1px solid #e2e8f0;border-radius:10px;font-size:14px;color:#111;line-height:1.5;">{}</div>"#,
                escape_multiline(b)
            ));
        }

        let label = self.category.item_label();
        for (i, item) in self.items.iter().enumerate() {
            let url = item.url.as_deref().map(clean_url);
            let badge = url
                .as_deref()
                .map(|u| format!(" · {}", escape(&domain(u))))
                .unwrap_or_default();
            let title = match &url {
                Some(u) => format!(
                    r#"<a href="{}" style="color:#111;text-decoration:none;">{}</a>"#,
                    escape(u),
                    escape(&item.title)
                ),
                None => escape(&item.title),
            };
            out.push_str(r#"<div style="border:1px solid #eee;border-radius:10px;padding:14px 16px;margin:12px 0;">"#);
            out.push_str(&format!(
                r#"<div style="font-size:14px;color:#999;">#{} · {} {}{}</div>"#,
                i + 1,
                item_icon(self.category),
                escape(label),
                badge
            ));
            out.push_str(&format!(
                r#"<div style="font-size:16px;font-weight:600;color:#111;margin:6px 0 10px;">{title}</div>"#
            ));
            if let Some(desc) = item.description.as_deref().filter(|d| !d.is_empty()) {
                out.push_str(&format!(
                    r#"<div style="margin-top:6px;font-size:13px;color:#555;line-height:1.4;">{}</div>"#,
                    escape_multiline(desc)
                ));
            }
            if let Some(u) = &url {
                out.push_str(&format!(
                    r#"<a href="{}" style="display:inline-block;padding:8px 12px;background:#2563eb;color:#fff;text-decoration:none;border-radius:6px;font-size:14px;">{}</a>"#,
                    escape(u),
                    button_label(self.category)
                ));
            }
            out.push_str("</div>");
        }

        let footer = if self.category == Category::Stocks {
            "Information is for awareness only and not investment advice."
        } else {
            "You can adjust your watcher in the dashboard anytime."
        };
        out.push_str(&format!(r#"<div style="{FOOTER_STYLE}">{footer}</div></div>"#));
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestLink {
    pub title: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestSection {
    pub watcher_name: String,
    pub summary: String,
    pub items: Vec<DigestLink>,
}

pub fn digest_html(date_label: &str, summary: &str, sections: &[DigestSection]) -> String {
    let mut out = String::with_capacity(4096);
    out.push_str(WRAP_OPEN);
    out.push_str(&format!(
        r#"<div style="border-bottom:1px solid #eee;padding-bottom:16px;margin-bottom:16px;"><div style="font-size:20px;font-weight:700;color:#111;">🗓️ Daily Digest</div><div style="font-size:14px;color:#666;">{}</div></div>"#,
        escape(date_label)
    ));
    let included: Vec<String> = sections
        .iter()
        .map(|s| format!("• {}", escape(&s.watcher_name)))
        .collect();
    out.push_str(&format!(
        r#"<div style="margin:10px 0 2px;font-size:13px;color:#555;">Included watchers:</div><div style="font-size:13px;color:#333;">{}</div>"#,
        included.join(" ")
    ));
    out.push_str(&format!(
        r#"<p style="font-size:14px;color:#333;line-height:1.5;">{}</p>"#,
        escape_multiline(summary)
    ));

    for s in sections {
        out.push_str(r#"<div style="margin:18px 0;padding:14px 16px;border:1px solid #eee;border-radius:10px;">"#);
        out.push_str(&format!(
            r#"<div style="font-weight:600;color:#111;margin-bottom:8px;">{}</div>"#,
            escape(&s.watcher_name)
        ));
        if !s.summary.is_empty() {
            out.push_str(&format!(
                r#"<div style="font-size:13px;color:#555;margin-bottom:6px;">{}</div>"#,
                escape(&s.summary)
            ));
        }
        out.push_str(r#"<ul style="margin:0;padding-left:18px;color:#333;">"#);
        for link in &s.items {
            let body = match link.url.as_deref().map(clean_url) {
                Some(u) => format!(
                    r#"<a href="{}" style="color:#2563eb;text-decoration:none;">{}</a>"#,
                    escape(&u),
                    escape(&link.title)
                ),
                None => escape(&link.title),
            };
            out.push_str(&format!(r#"<li style="margin:6px 0;">{body}</li>"#));
        }
        out.push_str("</ul></div>");
    }
    out.push_str(&format!(
        r#"<div style="{FOOTER_STYLE}">You can adjust your watchers in the dashboard anytime.</div></div>"#
    ));
    out
}
