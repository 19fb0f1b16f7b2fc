//! Bounded retry for a single destination/entry delivery.

use std::time::Duration;

use cqc_common::error::DeliveryError;
use cqc_common::types::{ChannelId, NotificationPayload};
use cqc_notifier::MessageSender;

/// Upper bound on any single wait, including platform-requested ones.
const MAX_BACKOFF: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
        }
    }

    /// Delay before attempt `attempt + 1`, given that attempt `attempt` (1-based) failed.
    ///
    /// Doubles from `base_backoff`; a platform `retry_after` wins when longer.
    pub fn backoff_after(&self, attempt: u32, error: &DeliveryError) -> Duration {
        let exp = self
            .base_backoff
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16));
        let requested = match error {
            DeliveryError::Transient {
                retry_after: Some(d),
                ..
            } => *d,
            _ => Duration::ZERO,
        };
        exp.max(requested).min(MAX_BACKOFF)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

/// Send with bounded retries on transient failures.
///
/// Permanent failures return immediately. After the last transient failure the
/// final error is returned for the caller to log.
pub async fn deliver_with_retry(
    sender: &dyn MessageSender,
    channel_id: ChannelId,
    payload: &NotificationPayload,
    policy: RetryPolicy,
) -> Result<u32, DeliveryError> {
    let mut attempt = 1;
    loop {
        match sender.send(channel_id, payload).await {
            Ok(()) => return Ok(attempt),
            Err(e) if e.is_permanent() => return Err(e),
            Err(e) if attempt >= policy.max_attempts => return Err(e),
            Err(e) => {
                let wait = policy.backoff_after(attempt, &e);
                tracing::debug!(
                    sender = sender.name(),
                    channel_id = %channel_id,
                    attempt,
                    wait_ms = wait.as_millis() as u64,
                    error = %e,
                    "Transient delivery failure, retrying"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
        }
    }
}
