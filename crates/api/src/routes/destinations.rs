//! Destination registry management routes.

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;

use cqc_common::error::AppError;
use cqc_common::types::{ChannelId, Destination, DestinationId};

use crate::middleware::auth::AdminAuth;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/destinations", get(list_destinations))
        .route(
            "/api/destinations/{id}",
            put(upsert_destination).delete(remove_destination),
        )
        .route("/api/destinations/{id}/channel", put(set_channel))
        .route("/api/destinations/{id}/enable", post(enable_destination))
        .route("/api/destinations/{id}/disable", post(disable_destination))
}

#[derive(Debug, Deserialize)]
pub struct SetChannelRequest {
    pub channel_id: ChannelId,
}

/// GET /api/destinations — All known destinations, sorted by id.
async fn list_destinations(
    State(state): State<AppState>,
    _auth: AdminAuth,
) -> Json<Vec<Destination>> {
    Json(state.registry.list().await)
}

/// PUT /api/destinations/:id — Register a destination; existing records are untouched.
async fn upsert_destination(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(id): Path<u64>,
) -> Json<Destination> {
    Json(state.registry.upsert(DestinationId(id)).await)
}

/// PUT /api/destinations/:id/channel — Point a destination at a channel.
async fn set_channel(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(id): Path<u64>,
    Json(req): Json<SetChannelRequest>,
) -> Result<Json<Destination>, AppError> {
    let dest = state
        .registry
        .set_channel(DestinationId(id), req.channel_id)
        .await?;

    tracing::info!(destination_id = id, channel_id = %req.channel_id, "Channel set via API");
    Ok(Json(dest))
}

/// POST /api/destinations/:id/enable — Turn delivery on. Requires a channel.
async fn enable_destination(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(id): Path<u64>,
) -> Result<Json<Destination>, AppError> {
    let dest = state.registry.enable(DestinationId(id)).await?;
    tracing::info!(destination_id = id, "Destination enabled via API");
    Ok(Json(dest))
}

/// POST /api/destinations/:id/disable — Turn delivery off.
async fn disable_destination(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(id): Path<u64>,
) -> Result<Json<Destination>, AppError> {
    let dest = state.registry.disable(DestinationId(id)).await?;
    tracing::info!(destination_id = id, "Destination disabled via API");
    Ok(Json(dest))
}

/// DELETE /api/destinations/:id — Forget a destination. Idempotent.
async fn remove_destination(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(id): Path<u64>,
) -> Json<serde_json::Value> {
    let removed = state.registry.remove(DestinationId(id)).await;
    Json(serde_json::json!({ "removed": removed }))
}
