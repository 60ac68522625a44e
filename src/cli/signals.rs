//! Signal handling for interrupting long transfers
//!
//! A `get` of a large video can take a while; CTRL-C or SIGTERM stops the
//! transfer by dropping the stream, which lets the cache discard its partial
//! temp file before the process exits.

use tokio::signal;
use tracing::{info, warn};

/// Resolve when CTRL-C or SIGTERM is received
///
/// If a handler cannot be installed, that signal source is ignored and the
/// future waits on the other one (or forever).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Ctrl+C signal received"),
            Err(e) => {
                warn!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("SIGTERM signal received");
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
