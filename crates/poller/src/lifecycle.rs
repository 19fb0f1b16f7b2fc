//! Process shutdown coordination.

use std::future::Future;

use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

/// Wait for the shutdown signal, then cancel `shutdown` and wait for `server`.
///
/// If the signal cannot be listened for, the process keeps running until the
/// server exits on its own; only then is `shutdown` cancelled.
pub async fn await_shutdown<S, T>(
    signal: S,
    server: JoinHandle<T>,
    shutdown: &CancellationToken,
) -> Result<T, JoinError>
where
    S: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            tracing::info!("Received shutdown signal, stopping gracefully...");
            shutdown.cancel();
            server.await
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                "Failed to listen for shutdown signal, running until the API server exits"
            );
            let result = server.await;
            shutdown.cancel();
            result
        }
    }
}
