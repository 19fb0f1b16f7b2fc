//! Chat command bridge.
//!
//! The chat gateway forwards slash-command invocations here; replies are
//! returned for the gateway to post back to the invoking user.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use cqc_common::error::AppError;
use cqc_common::types::ChannelId;
use cqc_engine::commands::{Command, CommandContext, CommandReply};

use crate::middleware::auth::AdminAuth;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/commands", post(run_command))
}

/// Request body for a command invocation.
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    /// Command name, with or without the leading slash
    pub command: String,
    /// Channel argument for `cqc_channel`
    #[serde(default)]
    pub channel_id: Option<ChannelId>,
    #[serde(flatten)]
    pub context: CommandContext,
}

/// POST /api/commands — Execute one chat command on behalf of a server member.
async fn run_command(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Json(req): Json<CommandRequest>,
) -> Result<Json<CommandReply>, AppError> {
    let command = Command::parse(&req.command, req.channel_id)?;
    let reply = state.commands.execute(&req.context, command).await?;
    Ok(Json(reply))
}
