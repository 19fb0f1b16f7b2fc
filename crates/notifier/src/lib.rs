//! Notification delivery.
//!
//! The engine talks to chat platforms only through [`MessageSender`]; the
//! Discord REST client is the production implementation.

pub mod discord;

use async_trait::async_trait;

use cqc_common::error::DeliveryError;
use cqc_common::types::{ChannelId, NotificationPayload};

pub use discord::DiscordSender;

/// Delivers one rendered notification to one channel.
///
/// Implementations make a single attempt and classify the outcome; retrying is
/// the caller's job.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(
        &self,
        channel_id: ChannelId,
        payload: &NotificationPayload,
    ) -> Result<(), DeliveryError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
