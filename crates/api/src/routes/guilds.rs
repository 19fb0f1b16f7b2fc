//! Server membership events forwarded by the chat gateway.

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use cqc_common::types::{ChannelId, DestinationId};
use cqc_engine::guild::{self, ChannelInfo};

use crate::middleware::auth::AdminAuth;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/guilds/{id}/joined", post(guild_joined))
        .route("/api/guilds/{id}/removed", post(guild_removed))
}

#[derive(Debug, Deserialize)]
pub struct GuildJoinedRequest {
    #[serde(default)]
    pub channels: Vec<ChannelInfo>,
}

#[derive(Debug, Serialize)]
pub struct GuildJoinedResponse {
    pub destination_id: DestinationId,
    /// Channel notifications are configured for, if one could be chosen
    pub channel_id: Option<ChannelId>,
}

/// POST /api/guilds/:id/joined — The bot was added to a server.
async fn guild_joined(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(id): Path<u64>,
    Json(req): Json<GuildJoinedRequest>,
) -> Json<GuildJoinedResponse> {
    let destination_id = DestinationId(id);
    let channel_id = guild::handle_guild_joined(
        &state.registry,
        state.sender.as_ref(),
        destination_id,
        &req.channels,
    )
    .await;

    Json(GuildJoinedResponse {
        destination_id,
        channel_id,
    })
}

/// POST /api/guilds/:id/removed — The bot was removed from a server.
async fn guild_removed(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(id): Path<u64>,
) -> Json<serde_json::Value> {
    guild::handle_guild_removed(&state.registry, DestinationId(id)).await;
    Json(serde_json::json!({ "removed": true }))
}
