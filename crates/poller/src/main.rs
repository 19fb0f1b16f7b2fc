use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use cqc_api::routes::create_router;
use cqc_api::state::AppState;
use cqc_common::config::AppConfig;
use cqc_engine::render::NotificationRenderer;
use cqc_engine::retry::RetryPolicy;
use cqc_engine::store::RegistryStore;
use cqc_engine::{DestinationRegistry, NotificationDispatcher};
use cqc_notifier::{DiscordSender, MessageSender};
use cqc_poller::lifecycle::await_shutdown;
use cqc_poller::{HttpLeaderboardSource, PollScheduler, SnapshotSource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "cqc_poller=info,cqc_engine=info,cqc_notifier=info,cqc_api=info,tower_http=info"
                    .into()
            }),
        )
        .json()
        .init();

    tracing::info!("CQC Monitor starting...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Load destination registry
    let registry = Arc::new(DestinationRegistry::open(RegistryStore::new(&config.registry_path)).await?);
    let stats = registry.stats().await;
    tracing::info!(
        path = %config.registry_path.display(),
        total = stats.total,
        enabled = stats.enabled,
        "Destination registry ready"
    );

    let sender: Arc<dyn MessageSender> = Arc::new(DiscordSender::new(
        config.discord_api_base.clone(),
        config.discord_bot_token.clone(),
        config.http_timeout(),
    )?);

    let dispatcher = Arc::new(NotificationDispatcher::new(
        registry.clone(),
        sender.clone(),
        NotificationRenderer::new(config.highlight_squadrons.clone()),
        RetryPolicy::new(config.delivery_max_attempts, config.delivery_backoff()),
        config.dispatch_concurrency,
    ));

    let source: Arc<dyn SnapshotSource> = Arc::new(HttpLeaderboardSource::new(
        config.leaderboard_url.clone(),
        config.diff_url.clone(),
        config.http_timeout(),
    )?);

    let mut scheduler = PollScheduler::new(
        source,
        dispatcher,
        config.poll_interval(),
        config.cycle_timeout(),
    );

    // Build API
    let bind_addr = config.api_bind_addr;
    let state = AppState::new(registry, sender, scheduler.subscribe(), config);
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("API server listening on {}", bind_addr);

    let shutdown = CancellationToken::new();

    let server = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
        }
    });

    let poller = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { scheduler.run(shutdown).await }
    });

    // Run until Ctrl+C
    let served = await_shutdown(tokio::signal::ctrl_c(), server, &shutdown).await;

    if let Err(e) = poller.await {
        tracing::error!(error = %e, "Poll scheduler task failed");
    }
    match served {
        Ok(Err(e)) => tracing::error!(error = %e, "API server exited with error"),
        Err(e) => tracing::error!(error = %e, "API server task failed"),
        Ok(Ok(())) => {}
    }

    tracing::info!("CQC Monitor stopped.");
    Ok(())
}
