// src/notify/router.rs
//! Turns a watcher's ranked net-new items into an immediate email, and
//! decides whether that email goes out now or waits for the digest.

use crate::model::{Category, SourcedItem, Watcher};
use crate::notify::render::AlertEmail;
use crate::notify::OutgoingEmail;
use crate::textgen::{synth, TextGen};

/// Users with several watchers get one digest instead of a stream of emails.
pub fn should_send_immediately(active_watchers_for_user: usize) -> bool {
    active_watchers_for_user <= 1
}

pub fn subject_for(watcher: &Watcher) -> String {
    format!("Watcher update: {}", watcher.name)
}

/// Build the email for `ranked` (already capped). Stocks get a per-symbol
/// briefing under a fixed intro; everything else gets a generated intro.
pub async fn compose(tg: &TextGen, watcher: &Watcher, ranked: &[SourcedItem], to: &str) -> OutgoingEmail {
    let (intro, briefing) = if watcher.category == Category::Stocks {
        (
            synth::intro_fallback(Category::Stocks, ranked.len()),
            Some(synth::stock_briefing(tg, watcher, ranked).await),
        )
    } else {
        (synth::notification_intro(tg, watcher, ranked).await, None)
    };

    let body = AlertEmail {
        watcher_name: &watcher.name,
        category: watcher.category,
        intro: &intro,
        briefing: briefing.as_deref(),
        items: ranked,
    };
    OutgoingEmail {
        to: to.to_string(),
        subject: subject_for(watcher),
        text: body.text(),
        html: Some(body.html()),
    }
}
