//! Poll scheduler — drives fetch → detect → dispatch on a fixed period.
//!
//! Cycles never overlap: the next tick is only awaited once the current cycle
//! has completed or its fetch has timed out. The last-seen snapshot is owned
//! here and only replaced after a cycle completes, so a failed or abandoned
//! fetch leaves it untouched and the next successful cycle reports the same
//! new entries. Dispatch is bounded by the HTTP timeout and retry policy.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use cqc_common::error::FetchError;
use cqc_common::types::{CyclePhase, PollStatus, Snapshot};
use cqc_engine::{DispatchReport, NotificationDispatcher};

use crate::fetcher::SnapshotSource;
use crate::novelty;

/// Result of one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed {
        new_entries: usize,
        report: DispatchReport,
    },
    FetchFailed(FetchError),
    TimedOut,
}

pub struct PollScheduler {
    source: Arc<dyn SnapshotSource>,
    dispatcher: Arc<NotificationDispatcher>,
    period: Duration,
    cycle_timeout: Duration,
    last_seen: Option<Snapshot>,
    status: watch::Sender<PollStatus>,
}

impl PollScheduler {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        dispatcher: Arc<NotificationDispatcher>,
        period: Duration,
        cycle_timeout: Duration,
    ) -> Self {
        let (status, _) = watch::channel(PollStatus {
            poll_interval_secs: period.as_secs(),
            ..Default::default()
        });
        Self {
            source,
            dispatcher,
            period,
            cycle_timeout,
            last_seen: None,
            status,
        }
    }

    /// Follow the scheduler's status.
    pub fn subscribe(&self) -> watch::Receiver<PollStatus> {
        self.status.subscribe()
    }

    pub fn last_seen(&self) -> Option<&Snapshot> {
        self.last_seen.as_ref()
    }

    /// Poll until `shutdown` fires. An in-flight cycle is allowed to finish
    /// before the loop exits.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        tracing::info!(
            source = self.source.name(),
            poll_interval_secs = self.period.as_secs(),
            cycle_timeout_secs = self.cycle_timeout.as_secs(),
            "Poll scheduler started"
        );

        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            self.run_cycle().await;
        }

        self.status.send_modify(|s| s.phase = CyclePhase::Stopped);
        tracing::info!("Poll scheduler stopped");
    }

    /// Run a single fetch → detect → dispatch cycle.
    ///
    /// Only the fetch runs under the cycle timeout. Once entries have been
    /// detected they are dispatched in full and `last_seen` advances, so a slow
    /// delivery can never cause the same entries to be detected again.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.status.send_modify(|s| s.phase = CyclePhase::Fetching);
        let fetched = tokio::time::timeout(self.cycle_timeout, self.source.fetch()).await;

        let outcome = match fetched {
            Ok(Ok(snapshot)) => {
                let (new_entries, report) = self.detect_and_dispatch(&snapshot).await;
                let action_id = snapshot.latest_action_id();
                self.status.send_modify(|s| {
                    s.cycles_succeeded += 1;
                    s.last_success_at = Some(Utc::now());
                    s.notifications_sent += report.delivered;
                    if action_id.is_some() {
                        s.last_action_id = action_id;
                    }
                });
                self.last_seen = Some(snapshot);
                CycleOutcome::Completed {
                    new_entries,
                    report,
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    source = self.source.name(),
                    error_kind = e.kind(),
                    error = %e,
                    "Fetch failed, skipping cycle"
                );
                self.status.send_modify(|s| s.cycles_failed += 1);
                CycleOutcome::FetchFailed(e)
            }
            Err(_) => {
                tracing::warn!(
                    source = self.source.name(),
                    timeout_secs = self.cycle_timeout.as_secs_f64(),
                    "Fetch timed out, abandoning cycle"
                );
                self.status.send_modify(|s| s.cycles_failed += 1);
                CycleOutcome::TimedOut
            }
        };

        self.status.send_modify(|s| s.phase = CyclePhase::Idle);
        outcome
    }

    async fn detect_and_dispatch(&self, current: &Snapshot) -> (usize, DispatchReport) {
        self.status.send_modify(|s| s.phase = CyclePhase::Detecting);
        let previous = self.last_seen.as_ref();
        let fresh = novelty::detect(previous, current);
        if previous.is_none() {
            tracing::info!(
                entries = current.len(),
                action_id = ?current.latest_action_id(),
                "Baseline snapshot recorded"
            );
        } else if fresh.is_empty() {
            tracing::debug!("No new activity");
        } else {
            tracing::info!(new_entries = fresh.len(), "New activity detected");
        }

        self.status.send_modify(|s| s.phase = CyclePhase::Dispatching);
        let report = self.dispatcher.dispatch(&fresh).await;
        (fresh.len(), report)
    }
}
