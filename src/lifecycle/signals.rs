//! OS signal handling.
//!
//! # Responsibilities
//! - Resolve on SIGINT (Ctrl+C) or SIGTERM so the binary can shut down
//! - Turn SIGHUP into a settings reload
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP triggers config reload, not shutdown
//! - A handler that cannot be installed is logged and treated as never firing

use std::sync::Arc;

use crate::lifecycle::reload::Reloader;
use crate::lifecycle::shutdown::ShutdownListener;

/// Wait for Ctrl+C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Interrupt received"),
        _ = terminate => tracing::info!("Terminate received"),
    }
    tracing::info!("Shutdown signal received");
}

/// Reload settings on every SIGHUP until shutdown.
#[cfg(unix)]
pub async fn reload_on_hangup(reloader: Arc<Reloader>, mut shutdown: ShutdownListener) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install SIGHUP handler, signal reloads disabled");
            return;
        }
    };

    loop {
        tokio::select! {
            received = hangup.recv() => {
                if received.is_none() {
                    break;
                }
                tracing::info!(file = %reloader.path().display(), "SIGHUP received, reloading settings");
                if let Err(e) = reloader.reload().await {
                    tracing::error!(error = %e, "Reload failed");
                }
            }
            _ = shutdown.wait() => break,
        }
    }
}

/// Signal reloads are unix-only; elsewhere this waits for shutdown.
#[cfg(not(unix))]
pub async fn reload_on_hangup(_reloader: Arc<Reloader>, mut shutdown: ShutdownListener) {
    shutdown.wait().await;
}
