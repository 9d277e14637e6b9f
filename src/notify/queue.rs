// src/notify/queue.rs
use anyhow::{anyhow, Result};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{DynMailer, OutgoingEmail};

pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("notify_emails_sent_total", "Emails accepted by the transport.");
        describe_counter!("notify_emails_failed_total", "Emails the transport rejected.");
    });
}

/// Send one email and record the outcome.
pub async fn deliver(mailer: &DynMailer, email: &OutgoingEmail) -> Result<()> {
    ensure_metrics_described();
    match mailer.send(email).await {
        Ok(()) => {
            counter!("notify_emails_sent_total").increment(1);
            tracing::info!(target: "notify", to = %email.to, subject = %email.subject, transport = mailer.name(), "email sent");
            Ok(())
        }
        Err(e) => {
            counter!("notify_emails_failed_total").increment(1);
            tracing::warn!(target: "notify", to = %email.to, subject = %email.subject, error = %e, "email failed");
            Err(e)
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub sent: usize,
    pub failed: usize,
}

/// Bounded queue drained by one worker task. `enqueue` waits when full.
pub struct NotifyQueue {
    tx: mpsc::Sender<OutgoingEmail>,
    worker: JoinHandle<QueueStats>,
}

impl NotifyQueue {
    pub fn spawn(mailer: DynMailer, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<OutgoingEmail>(capacity.max(1));
        let worker = tokio::spawn(async move {
            let mut stats = QueueStats::default();
            while let Some(email) = rx.recv().await {
                match deliver(&mailer, &email).await {
                    Ok(()) => stats.sent += 1,
                    Err(_) => stats.failed += 1,
                }
            }
            stats
        });
        Self { tx, worker }
    }

    pub async fn enqueue(&self, email: OutgoingEmail) -> Result<()> {
        self.tx
            .send(email)
            .await
            .map_err(|_| anyhow!("notification worker stopped"))
    }

    /// Close the queue and wait until every queued email was attempted.
    pub async fn finish(self) -> QueueStats {
        drop(self.tx);
        match self.worker.await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!(target: "notify", error = %e, "notification worker aborted");
                QueueStats::default()
            }
        }
    }
}
