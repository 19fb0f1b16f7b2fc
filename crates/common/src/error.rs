use std::time::Duration;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::types::DestinationId;

/// Failure to obtain a leaderboard snapshot. Both kinds skip the current cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Transient fetch failure: {0}")]
    Transient(String),

    #[error("Malformed upstream response: {0}")]
    Malformed(String),
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transient(_) => "transient",
            FetchError::Malformed(_) => "malformed",
        }
    }
}

/// Failure to deliver a notification to one destination.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Rate limit, timeout or server error. Worth retrying.
    #[error("Transient delivery failure: {reason}")]
    Transient {
        reason: String,
        /// Delay requested by the platform before the next attempt.
        retry_after: Option<Duration>,
    },

    /// The channel or server is no longer reachable.
    #[error("Permanent delivery failure: {0}")]
    Permanent(String),
}

impl DeliveryError {
    pub fn transient(reason: impl Into<String>) -> Self {
        DeliveryError::Transient {
            reason: reason.into(),
            retry_after: None,
        }
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, DeliveryError::Permanent(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DeliveryError::Transient { .. } => "transient",
            DeliveryError::Permanent(_) => "permanent",
        }
    }
}

/// Rejected destination registry operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Destination {0} not found")]
    NotFound(DestinationId),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Rejected chat command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Only an administrator can use this command.")]
    Forbidden,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Errors surfaced over the HTTP API.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Authentication error: {0}")]
    Auth(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Registry(RegistryError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Registry(RegistryError::InvalidState(_)) => StatusCode::CONFLICT,
            AppError::Command(CommandError::Forbidden) => StatusCode::FORBIDDEN,
            AppError::Command(CommandError::UnknownCommand(_))
            | AppError::Command(CommandError::MissingArgument(_)) => StatusCode::BAD_REQUEST,
            AppError::Command(CommandError::Registry(RegistryError::NotFound(_))) => {
                StatusCode::NOT_FOUND
            }
            AppError::Command(CommandError::Registry(RegistryError::InvalidState(_))) => {
                StatusCode::CONFLICT
            }
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
        };

        let body = json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
