//! Signal handling for graceful server shutdown.
//!
//! This module provides cross-platform signal handling so the server can
//! shut down gracefully when receiving termination signals.

use tracing::info;

/// Waits for a shutdown signal.
///
/// Returns when a termination signal is received (SIGINT or SIGTERM on
/// Unix; Ctrl+C on Windows), or an error if signal handling setup failed.
pub async fn wait_for_shutdown() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => (),
            _ = sigterm.recv() => ()
        }
    }

    #[cfg(windows)]
    tokio::signal::ctrl_c().await?;

    info!("📡 Received shutdown signal - initiating graceful shutdown");
    Ok(())
}
