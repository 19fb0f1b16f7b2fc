//! Chat command table.
//!
//! Every command maps statically onto a handler working only through the
//! registry's typed interface. Informational commands are open to everyone;
//! the rest require server administrator rights. Any command lazily registers
//! the invoking server.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use cqc_common::error::CommandError;
use cqc_common::types::{ChannelId, DestinationId, PollStatus};

use crate::registry::DestinationRegistry;
use crate::render::{COLOR_BLUE, FOOTER};

const COLOR_GOLD: u32 = 0xf1c40f;
const COLOR_RED: u32 = 0xe74c3c;

/// Static description of one command.
pub struct CommandSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub admin_only: bool,
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "cqc_help",
        description: "View list of commands",
        admin_only: false,
    },
    CommandSpec {
        name: "cqc_info",
        description: "Learn about CQC",
        admin_only: false,
    },
    CommandSpec {
        name: "cqc_bugs",
        description: "Learn how to circumvent CQC's game breaking bugs",
        admin_only: false,
    },
    CommandSpec {
        name: "cqc_status",
        description: "View bot status",
        admin_only: true,
    },
    CommandSpec {
        name: "cqc_channel",
        description: "Change notification channel",
        admin_only: true,
    },
    CommandSpec {
        name: "cqc_this_channel",
        description: "Set current channel for notifications",
        admin_only: true,
    },
    CommandSpec {
        name: "cqc_disable",
        description: "Disable notifications",
        admin_only: true,
    },
    CommandSpec {
        name: "cqc_enable",
        description: "Enable notifications",
        admin_only: true,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Info,
    Bugs,
    Status,
    SetChannel(ChannelId),
    ThisChannel,
    Enable,
    Disable,
}

impl Command {
    pub fn parse(name: &str, channel: Option<ChannelId>) -> Result<Self, CommandError> {
        match name.trim_start_matches('/') {
            "cqc_help" => Ok(Command::Help),
            "cqc_info" => Ok(Command::Info),
            "cqc_bugs" => Ok(Command::Bugs),
            "cqc_status" => Ok(Command::Status),
            "cqc_channel" => channel
                .map(Command::SetChannel)
                .ok_or(CommandError::MissingArgument("channel")),
            "cqc_this_channel" => Ok(Command::ThisChannel),
            "cqc_enable" => Ok(Command::Enable),
            "cqc_disable" => Ok(Command::Disable),
            other => Err(CommandError::UnknownCommand(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Help => "cqc_help",
            Command::Info => "cqc_info",
            Command::Bugs => "cqc_bugs",
            Command::Status => "cqc_status",
            Command::SetChannel(_) => "cqc_channel",
            Command::ThisChannel => "cqc_this_channel",
            Command::Enable => "cqc_enable",
            Command::Disable => "cqc_disable",
        }
    }

    pub fn requires_admin(&self) -> bool {
        COMMANDS
            .iter()
            .find(|entry| entry.name == self.name())
            .is_some_and(|entry| entry.admin_only)
    }
}

/// Who invoked a command, and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandContext {
    pub destination_id: DestinationId,
    pub invoking_channel_id: ChannelId,
    pub is_admin: bool,
}

/// Response to show the invoking user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReply {
    pub title: Option<String>,
    pub body: String,
    pub color: u32,
    pub footer: Option<String>,
    /// Only visible to the invoking user.
    pub ephemeral: bool,
}

impl CommandReply {
    fn plain(body: impl Into<String>) -> Self {
        Self {
            title: None,
            body: body.into(),
            color: COLOR_BLUE,
            footer: None,
            ephemeral: false,
        }
    }

    fn embed(title: &str, body: impl Into<String>, color: u32, footer: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            body: body.into(),
            color,
            footer: Some(footer.to_string()),
            ephemeral: true,
        }
    }
}

pub struct CommandHandler {
    registry: Arc<DestinationRegistry>,
    poll_status: watch::Receiver<PollStatus>,
}

impl CommandHandler {
    pub fn new(registry: Arc<DestinationRegistry>, poll_status: watch::Receiver<PollStatus>) -> Self {
        Self {
            registry,
            poll_status,
        }
    }

    pub async fn execute(
        &self,
        ctx: &CommandContext,
        command: Command,
    ) -> Result<CommandReply, CommandError> {
        if command.requires_admin() && !ctx.is_admin {
            tracing::info!(
                destination_id = %ctx.destination_id,
                command = command.name(),
                "Rejected admin command from non-administrator"
            );
            return Err(CommandError::Forbidden);
        }

        self.registry.upsert(ctx.destination_id).await;

        let reply = match command {
            Command::Help => help_reply(),
            Command::Info => info_reply(),
            Command::Bugs => bugs_reply(),
            Command::Status => self.status_reply(ctx.destination_id).await,
            Command::SetChannel(channel_id) => {
                self.set_channel(ctx.destination_id, channel_id).await?
            }
            Command::ThisChannel => {
                self.set_channel(ctx.destination_id, ctx.invoking_channel_id)
                    .await?
            }
            Command::Enable => {
                self.registry.enable(ctx.destination_id).await?;
                CommandReply::plain("CQC notifications enabled!")
            }
            Command::Disable => {
                self.registry.disable(ctx.destination_id).await?;
                CommandReply::plain("CQC notifications disabled.")
            }
        };

        tracing::debug!(
            destination_id = %ctx.destination_id,
            command = command.name(),
            "Command executed"
        );
        Ok(reply)
    }

    async fn set_channel(
        &self,
        destination_id: DestinationId,
        channel_id: ChannelId,
    ) -> Result<CommandReply, CommandError> {
        let dest = self.registry.set_channel(destination_id, channel_id).await?;
        let mut body = format!("CQC notifications will now be sent to <#{}>", channel_id);
        if !dest.enabled {
            body.push_str("\nUse `/cqc_enable` to start receiving updates.");
        }
        Ok(CommandReply::plain(body))
    }

    async fn status_reply(&self, destination_id: DestinationId) -> CommandReply {
        let stats = self.registry.stats().await;
        let status = self.poll_status.borrow().clone();

        let this_server = match self.registry.get(destination_id).await {
            Some(dest) => {
                let channel = dest
                    .channel_id
                    .map(|c| format!("<#{}>", c))
                    .unwrap_or_else(|| "Not configured".to_string());
                let state = if !dest.valid {
                    "Unreachable (set a new channel to recover)"
                } else if dest.enabled {
                    "Active"
                } else {
                    "Disabled"
                };
                format!("Channel: {}\nStatus: {}", channel, state)
            }
            None => "Not configured".to_string(),
        };

        let last_action = status
            .last_action_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none yet".to_string());

        let body = format!(
            "**Global Stats**\nTracking **{}** servers, **{}** receiving updates\n\n\
             **This Server**\n{}\n\n\
             **Update Frequency**\nEvery {} seconds\nLast action: {}",
            stats.total, stats.enabled, this_server, status.poll_interval_secs, last_action
        );

        CommandReply::embed("CQC Monitor Bot Status", body, COLOR_BLUE, FOOTER)
    }
}

/// Command list, generated from [`COMMANDS`].
pub fn help_text() -> String {
    let section = |admin: bool| {
        COMMANDS
            .iter()
            .filter(|entry| entry.admin_only == admin)
            .map(|entry| format!("`/{}` - {}", entry.name, entry.description))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        "**General Commands:**\n{}\n\n**Admin Commands:**\n{}",
        section(false),
        section(true)
    )
}

fn help_reply() -> CommandReply {
    CommandReply::embed("CQC Bot Help & Commands", help_text(), COLOR_BLUE, FOOTER)
}

fn info_reply() -> CommandReply {
    let body = "**Close Quarters Championship (CQC)** is Elite Dangerous' arena combat mode.\n\n\
         🕹 **Modes:**\n\
         • Deathmatch: 2-8 players, free for all\n\
         • Team Deathmatch: 4-8 players, minimum 2v2\n\
         • Capture the Flag: 4-8 players, minimum 2v2\n\n\
         👥 **Squads:**\n\
         • Squads of up to 4 players spawn together\n\
         • Matchmaking is non-exclusive\n\n\
         This bot tracks squadron activity on the CQC leaderboard. \
         Only CMDRs in squadrons are tracked.";
    CommandReply::embed(
        "🚀 What is Elite Dangerous CQC?",
        body,
        COLOR_GOLD,
        "Close Quarters Championship",
    )
}

fn bugs_reply() -> CommandReply {
    let body = "Known game-breaking bugs in CQC and how to get around them:\n\n\
         **1. Match end error.** After a match you are dropped to the main menu with an error. \
         Players still in that lobby can no longer be joined.\n\
         **2. Broken lobbies.** A lobby with enough players that keeps waiting for more is bugged. \
         Everyone has to leave and requeue so a fresh lobby is created.\n\
         **3. Incompatible clients.** Two players who never see each other or cannot squad up \
         both need to restart the game from desktop.";
    CommandReply::embed(
        "📢 CQC Game Breaking Bugs",
        body,
        COLOR_RED,
        "Close Quarters Championship",
    )
}
