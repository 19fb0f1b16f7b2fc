//! Notification fan-out.
//!
//! For each new entry (in order), every destination from a single
//! `list_enabled()` snapshot taken at dispatch start gets at most one delivery.
//! Deliveries to different destinations run in parallel under a semaphore and
//! never affect each other: a failure is logged, and a permanent failure marks
//! that destination invalid through the registry and drops it from the rest of
//! this dispatch.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use cqc_common::types::{DestinationId, LeaderboardEntry};
use cqc_notifier::MessageSender;

use crate::registry::DestinationRegistry;
use crate::render::NotificationRenderer;
use crate::retry::{RetryPolicy, deliver_with_retry};

/// Totals for one `dispatch` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub entries: usize,
    pub delivered: u64,
    /// Destination/entry pairs given up on after transient failures.
    pub dropped: u64,
    pub invalidated: Vec<DestinationId>,
}

pub struct NotificationDispatcher {
    registry: Arc<DestinationRegistry>,
    sender: Arc<dyn MessageSender>,
    renderer: NotificationRenderer,
    retry: RetryPolicy,
    semaphore: Arc<Semaphore>,
}

impl NotificationDispatcher {
    pub fn new(
        registry: Arc<DestinationRegistry>,
        sender: Arc<dyn MessageSender>,
        renderer: NotificationRenderer,
        retry: RetryPolicy,
        concurrency: usize,
    ) -> Self {
        Self {
            registry,
            sender,
            renderer,
            retry,
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    pub async fn dispatch(&self, entries: &[LeaderboardEntry]) -> DispatchReport {
        let mut report = DispatchReport {
            entries: entries.len(),
            ..Default::default()
        };
        if entries.is_empty() {
            return report;
        }

        let mut targets = self.registry.list_enabled().await;
        if targets.is_empty() {
            tracing::info!(entries = entries.len(), "No enabled destinations, nothing to deliver");
            return report;
        }

        for entry in entries {
            if targets.is_empty() {
                break;
            }

            let payload = Arc::new(self.renderer.render(entry));
            let mut tasks = JoinSet::new();

            for dest in &targets {
                let Some(channel_id) = dest.channel_id else {
                    continue;
                };
                let destination_id = dest.destination_id;
                let sender = Arc::clone(&self.sender);
                let payload = Arc::clone(&payload);
                let semaphore = Arc::clone(&self.semaphore);
                let policy = self.retry;

                tasks.spawn(async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    let outcome =
                        deliver_with_retry(&*sender, channel_id, &payload, policy).await;
                    (destination_id, channel_id, outcome)
                });
            }

            let mut invalidated = HashSet::new();
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((destination_id, channel_id, Ok(attempts))) => {
                        tracing::debug!(
                            destination_id = %destination_id,
                            channel_id = %channel_id,
                            entry_id = %entry.id,
                            attempts,
                            "Notification delivered"
                        );
                        report.delivered += 1;
                    }
                    Ok((destination_id, channel_id, Err(e))) if e.is_permanent() => {
                        tracing::warn!(
                            destination_id = %destination_id,
                            channel_id = %channel_id,
                            entry_id = %entry.id,
                            error_kind = e.kind(),
                            error = %e,
                            "Destination unreachable, invalidating"
                        );
                        self.registry.mark_invalid(destination_id).await;
                        invalidated.insert(destination_id);
                        report.invalidated.push(destination_id);
                    }
                    Ok((destination_id, channel_id, Err(e))) => {
                        tracing::warn!(
                            destination_id = %destination_id,
                            channel_id = %channel_id,
                            entry_id = %entry.id,
                            error_kind = e.kind(),
                            error = %e,
                            attempts = self.retry.max_attempts,
                            "Delivery failed after retries, dropping"
                        );
                        report.dropped += 1;
                    }
                    Err(join_err) => {
                        tracing::error!(
                            entry_id = %entry.id,
                            error = %join_err,
                            "Delivery task failed"
                        );
                        report.dropped += 1;
                    }
                }
            }

            targets.retain(|d| !invalidated.contains(&d.destination_id));
        }

        tracing::info!(
            sender = self.sender.name(),
            entries = report.entries,
            delivered = report.delivered,
            dropped = report.dropped,
            invalidated = report.invalidated.len(),
            "Dispatch complete"
        );
        report
    }
}
