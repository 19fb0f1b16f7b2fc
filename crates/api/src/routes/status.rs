//! Poll loop and registry status.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use cqc_common::types::{PollStatus, RegistryStats};

use crate::middleware::auth::AdminAuth;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/status", get(get_status))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub poll: PollStatus,
    pub registry: RegistryStats,
}

/// GET /api/status — Latest poll cycle status plus registry counts.
async fn get_status(State(state): State<AppState>, _auth: AdminAuth) -> Json<StatusResponse> {
    let poll = state.poll_status.borrow().clone();
    let registry = state.registry.stats().await;
    Json(StatusResponse { poll, registry })
}
