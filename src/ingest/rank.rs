// src/ingest/rank.rs
use crate::model::SourcedItem;

/// Upper bound on items in one notification (and in AI summary input).
pub const MAX_NOTIFICATION_ITEMS: usize = 20;

/// Most matched keywords first; ties broken by title, ascending.
pub fn rank(items: &[SourcedItem]) -> Vec<SourcedItem> {
    let mut ranked = items.to_vec();
    ranked.sort_by(|a, b| {
        b.matched_keywords
            .len()
            .cmp(&a.matched_keywords.len())
            .then_with(|| a.title.cmp(&b.title))
    });
    ranked
}

/// Ranked and truncated to `cap`.
pub fn top_n(items: &[SourcedItem], cap: usize) -> Vec<SourcedItem> {
    let mut ranked = rank(items);
    ranked.truncate(cap);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, matches: usize) -> SourcedItem {
        SourcedItem {
            source: "s".into(),
            title: title.into(),
            description: None,
            url: None,
            matched_keywords: (0..matches).map(|i| format!("k{i}")).collect(),
        }
    }

    #[test]
    fn more_matches_first_then_title() {
        let items = vec![item("b", 1), item("z", 3), item("a", 3), item("c", 0)];
        let titles: Vec<_> = rank(&items).into_iter().map(|i| i.title).collect();
        assert_eq!(titles, vec!["a", "z", "b", "c"]);
    }

    #[test]
    fn truncates_to_cap() {
        let items: Vec<_> = (0..25).map(|i| item(&format!("t{i:02}"), i % 3)).collect();
        let top = top_n(&items, MAX_NOTIFICATION_ITEMS);
        assert_eq!(top.len(), 20);
        assert_eq!(top[0].matched_keywords.len(), 2);
    }
}
