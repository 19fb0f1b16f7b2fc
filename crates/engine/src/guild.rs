//! Server membership events: the bot joining or leaving a chat server.

use serde::{Deserialize, Serialize};

use cqc_common::types::{ChannelId, DestinationId, NotificationPayload};
use cqc_notifier::MessageSender;

use crate::commands::help_text;
use crate::registry::DestinationRegistry;
use crate::render::{COLOR_BLUE, FOOTER};

const PREFERRED_KEYWORDS: &[&str] = &["elite", "cqc", "bot", "gaming"];
const GENERAL_KEYWORDS: &[&str] = &["general", "main", "chat"];
const AVOIDED_KEYWORDS: &[&str] = &["spam", "log"];

/// A text channel visible to the bot in a newly joined server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: String,
    /// Whether the bot may post messages there.
    pub can_send: bool,
}

/// Pick the channel a new server's notifications default to.
///
/// Among channels the bot can post in, the last one named after the game or
/// bots wins. Otherwise the first channel in server order that is either a
/// general chat channel or does not look like a spam or log channel.
pub fn pick_default_channel(channels: &[ChannelInfo]) -> Option<ChannelId> {
    let matches = |name: &str, keywords: &[&str]| keywords.iter().any(|k| name.contains(k));
    let writable = || channels.iter().filter(|c| c.can_send);

    let preferred = writable()
        .rev()
        .find(|c| matches(&c.name.to_lowercase(), PREFERRED_KEYWORDS));

    preferred
        .or_else(|| {
            writable().find(|c| {
                let name = c.name.to_lowercase();
                matches(&name, GENERAL_KEYWORDS) || !matches(&name, AVOIDED_KEYWORDS)
            })
        })
        .map(|c| c.id)
}

/// Register a newly joined server and point it at a sensible channel.
///
/// Delivery stays disabled until an administrator enables it. A welcome
/// message is posted to the chosen channel; failing to post is only logged.
pub async fn handle_guild_joined(
    registry: &DestinationRegistry,
    sender: &dyn MessageSender,
    destination_id: DestinationId,
    channels: &[ChannelInfo],
) -> Option<ChannelId> {
    tracing::info!(destination_id = %destination_id, "Bot added to server");
    registry.upsert(destination_id).await;

    let existing = registry
        .get(destination_id)
        .await
        .and_then(|d| d.channel_id);
    if existing.is_some() {
        return existing;
    }

    let Some(channel_id) = pick_default_channel(channels) else {
        tracing::info!(destination_id = %destination_id, "No suitable channel found");
        return None;
    };

    if let Err(e) = registry.set_channel(destination_id, channel_id).await {
        tracing::warn!(destination_id = %destination_id, error = %e, "Server left during setup");
        return None;
    }

    if let Err(e) = sender.send(channel_id, &welcome_message(channel_id)).await {
        tracing::warn!(
            destination_id = %destination_id,
            channel_id = %channel_id,
            error_kind = e.kind(),
            error = %e,
            "Couldn't send welcome message"
        );
    }

    Some(channel_id)
}

/// Forget a server the bot no longer has access to. Safe to call repeatedly.
pub async fn handle_guild_removed(registry: &DestinationRegistry, destination_id: DestinationId) {
    if registry.remove(destination_id).await {
        tracing::info!(destination_id = %destination_id, "Bot removed from server");
    }
}

pub fn welcome_message(channel_id: ChannelId) -> NotificationPayload {
    NotificationPayload {
        title: "CQC Monitor Bot Active!".to_string(),
        body: format!(
            "Thanks for adding the CQC Monitor Bot!\n\n\
             CQC activity updates will be posted in <#{}> once an administrator runs `/cqc_enable`.\n\n\
             Note that only CMDRs in squadrons are tracked.\n\n{}",
            channel_id,
            help_text()
        ),
        color: COLOR_BLUE,
        footer: Some(FOOTER.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(id: u64, name: &str, can_send: bool) -> ChannelInfo {
        ChannelInfo {
            id: ChannelId(id),
            name: name.to_string(),
            can_send,
        }
    }

    #[test]
    fn test_prefers_game_channels() {
        let channels = vec![
            channel(1, "general", true),
            channel(2, "random", true),
            channel(3, "Elite-Dangerous", true),
        ];
        assert_eq!(pick_default_channel(&channels), Some(ChannelId(3)));
    }

    #[test]
    fn test_general_and_other_keep_server_order() {
        let channels = vec![channel(1, "memes", true), channel(2, "main-chat", true)];
        assert_eq!(pick_default_channel(&channels), Some(ChannelId(1)));
    }

    #[test]
    fn test_general_channel_with_log_in_name_still_eligible() {
        let channels = vec![channel(1, "spam", true), channel(2, "general-log", true)];
        assert_eq!(pick_default_channel(&channels), Some(ChannelId(2)));
    }

    #[test]
    fn test_skips_unwritable_and_log_channels() {
        let channels = vec![
            channel(1, "cqc", false),
            channel(2, "mod-log", true),
            channel(3, "spam", true),
            channel(4, "lounge", true),
        ];
        assert_eq!(pick_default_channel(&channels), Some(ChannelId(4)));
    }

    #[test]
    fn test_no_suitable_channel() {
        let channels = vec![channel(1, "audit-log", true), channel(2, "bots", false)];
        assert_eq!(pick_default_channel(&channels), None);
    }

    #[test]
    fn test_last_preferred_channel_wins() {
        let channels = vec![
            channel(5, "bot-commands", true),
            channel(6, "cqc", true),
            channel(7, "general", true),
        ];
        assert_eq!(pick_default_channel(&channels), Some(ChannelId(6)));
    }
}
