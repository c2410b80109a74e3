//! Signal handling for graceful shutdown
//!
//! Ctrl-C or SIGTERM cancels the worker pool's token. In-flight downloads
//! stop at their next await point and their jobs stay pending for the next
//! run.

use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cancel `token` when the process receives Ctrl-C or SIGTERM
///
/// The returned task ends once a signal arrives or `token` is cancelled by
/// someone else; abort it after a normal run.
pub fn cancel_on_signal(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                warn!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received Ctrl+C, cancelling downloads");
            },
            _ = terminate => {
                info!("Received terminate signal, cancelling downloads");
            },
            _ = token.cancelled() => return,
        }

        token.cancel();
    })
}
