//! Shared application state for the Axum API server.

use std::sync::Arc;

use tokio::sync::watch;

use cqc_common::config::AppConfig;
use cqc_common::types::PollStatus;
use cqc_engine::DestinationRegistry;
use cqc_engine::commands::CommandHandler;
use cqc_notifier::MessageSender;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<DestinationRegistry>,
    pub sender: Arc<dyn MessageSender>,
    pub commands: Arc<CommandHandler>,
    pub poll_status: watch::Receiver<PollStatus>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(
        registry: Arc<DestinationRegistry>,
        sender: Arc<dyn MessageSender>,
        poll_status: watch::Receiver<PollStatus>,
        config: AppConfig,
    ) -> Self {
        let commands = Arc::new(CommandHandler::new(registry.clone(), poll_status.clone()));
        Self {
            registry,
            sender,
            commands,
            poll_status,
            config,
        }
    }
}
