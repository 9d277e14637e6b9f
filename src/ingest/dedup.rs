// src/ingest/dedup.rs
use std::collections::HashSet;

use crate::model::SourcedItem;

/// Keep items that have no URL, or whose URL is neither already persisted for
/// the watcher nor seen earlier in this batch. Exact string comparison; order kept.
///
/// URL-less items have no stable identity and always pass.
pub fn dedupe(items: Vec<SourcedItem>, existing_urls: &HashSet<String>) -> Vec<SourcedItem> {
    let mut seen: HashSet<String> = HashSet::new();
    items
        .into_iter()
        .filter(|it| match it.url.as_deref() {
            None => true,
            Some(url) => !existing_urls.contains(url) && seen.insert(url.to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, url: Option<&str>) -> SourcedItem {
        SourcedItem {
            source: "s".into(),
            title: title.into(),
            description: None,
            url: url.map(str::to_string),
            matched_keywords: vec![],
        }
    }

    #[test]
    fn drops_known_urls_keeps_urlless() {
        let existing: HashSet<String> = ["A".to_string(), "B".to_string()].into();
        let out = dedupe(
            vec![item("a", Some("A")), item("b", Some("B")), item("c", Some("C")), item("n", None)],
            &existing,
        );
        let titles: Vec<_> = out.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["c", "n"]);
    }

    #[test]
    fn repeated_url_in_batch_kept_once() {
        let out = dedupe(
            vec![item("first", Some("X")), item("second", Some("X")), item("n1", None), item("n2", None)],
            &HashSet::new(),
        );
        let titles: Vec<_> = out.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "n1", "n2"]);
    }

    #[test]
    fn comparison_is_exact() {
        let existing: HashSet<String> = ["https://a.com/x".to_string()].into();
        let out = dedupe(vec![item("t", Some("https://a.com/x/"))], &existing);
        assert_eq!(out.len(), 1);
    }
}
