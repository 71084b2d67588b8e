//! Settings-file driven reloads.
//!
//! # Responsibilities
//! - Load and validate the settings file
//! - Hand a valid document to the registry for a full reload
//! - Turn file change events into exactly one reload each
//!
//! # Design Decisions
//! - Validate first: a broken document never reaches `stop_all`, so the
//!   running generation keeps serving
//! - A rejected document does not end watching; the next good write applies

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::{load_settings, ConfigError, FileChangedEvent};
use crate::lifecycle::registry::{ListenerRegistry, ReloadReport};
use crate::lifecycle::shutdown::ShutdownListener;

/// Error type for a reload attempt.
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("settings rejected, listeners left untouched: {0}")]
    Config(#[from] ConfigError),
}

/// Reloads the registry from one settings file.
pub struct Reloader {
    path: PathBuf,
    registry: Arc<ListenerRegistry>,
}

impl Reloader {
    pub fn new(path: impl Into<PathBuf>, registry: Arc<ListenerRegistry>) -> Self {
        Self {
            path: path.into(),
            registry,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn registry(&self) -> &Arc<ListenerRegistry> {
        &self.registry
    }

    /// Load the settings file and replace every listener with its contents.
    pub async fn reload(&self) -> Result<ReloadReport, ReloadError> {
        let settings = load_settings(&self.path)?;
        tracing::info!(
            id = %settings.id,
            schema = %settings.schema,
            listeners = settings.listeners.len(),
            "Applying settings"
        );

        let report = self.registry.reload(settings.listeners).await;
        for failure in &report.failures {
            tracing::error!(
                listener = %failure.listener,
                port = failure.port,
                error = %failure.error,
                "Listener failed to start"
            );
        }
        Ok(report)
    }

    /// Reload once per change event until the stream ends or shutdown fires.
    pub async fn watch(&self, mut events: mpsc::UnboundedReceiver<FileChangedEvent>, mut shutdown: ShutdownListener) {
        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        tracing::info!("Config change stream closed");
                        break;
                    };
                    tracing::warn!(
                        file = %event.file_name.display(),
                        before = %event.hash_before,
                        after = %event.hash_after,
                        "Config file changed"
                    );
                    if let Err(e) = self.reload().await {
                        tracing::error!(error = %e, "Reload failed");
                    }
                }
                _ = shutdown.wait() => {
                    tracing::debug!("Config watch loop stopping");
                    break;
                }
            }
        }
    }
}
