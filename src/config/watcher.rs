//! Configuration file watcher for hot reload.
//!
//! The watcher turns byte-level changes of one file into a stream of
//! [`FileChangedEvent`]s. `notify`'s poll watcher detects writes; each
//! detection is confirmed by hashing the content, and an event is emitted
//! only when the hash differs from the last one observed. Bursts of writes
//! that land between two polls therefore collapse into a single transition.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, PollWatcher, RecursiveMode, Watcher};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::mpsc;

/// Default interval between polls of the watched file.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A content change observed on the watched file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChangedEvent {
    pub file_name: PathBuf,
    pub hash_before: String,
    pub hash_after: String,
}

/// Error type for watcher setup.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("error reading watched file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("watched file {0} is empty")]
    Empty(PathBuf),

    #[error("watch error: {0}")]
    Notify(#[from] notify::Error),
}

/// Hex-encoded SHA-256 of a file's content.
pub fn hash_file(path: &Path) -> Result<String, WatchError> {
    let bytes = fs::read(path).map_err(|source| WatchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.is_empty() {
        return Err(WatchError::Empty(path.to_path_buf()));
    }
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Remembers the last observed hash and reports transitions.
#[derive(Debug)]
pub struct HashTracker {
    file_name: PathBuf,
    last: String,
}

impl HashTracker {
    pub fn new(file_name: PathBuf, initial: String) -> Self {
        Self { file_name, last: initial }
    }

    /// Record a freshly computed hash. Returns an event if it differs from
    /// the previous one.
    pub fn observe(&mut self, current: String) -> Option<FileChangedEvent> {
        if current == self.last {
            return None;
        }
        let hash_before = std::mem::replace(&mut self.last, current);
        Some(FileChangedEvent {
            file_name: self.file_name.clone(),
            hash_before,
            hash_after: self.last.clone(),
        })
    }

    pub fn last(&self) -> &str {
        &self.last
    }
}

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    poll_interval: Duration,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher polling every [`DEFAULT_POLL_INTERVAL`].
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Start watching the file on notify's polling thread.
    ///
    /// Returns the watcher, which must be kept alive for events to flow, and
    /// the receiving end of the event stream. The stream ends when the
    /// watcher is dropped.
    pub fn run(self) -> Result<(PollWatcher, mpsc::UnboundedReceiver<FileChangedEvent>), WatchError> {
        let initial = hash_file(&self.path)?;
        let mut tracker = HashTracker::new(self.path.clone(), initial);
        let (tx, rx) = mpsc::unbounded_channel();
        let path = self.path.clone();

        let config = Config::default()
            .with_poll_interval(self.poll_interval)
            .with_compare_contents(true);

        let mut watcher = PollWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    match hash_file(&path) {
                        Ok(current) => {
                            if let Some(change) = tracker.observe(current) {
                                tracing::debug!(
                                    file = %change.file_name.display(),
                                    before = %change.hash_before,
                                    after = %change.hash_after,
                                    "Watched file content changed"
                                );
                                let _ = tx.send(change);
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "Failed to hash watched file"),
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            config,
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(
            path = %self.path.display(),
            interval_ms = self.poll_interval.as_millis() as u64,
            "Config watcher started"
        );
        Ok((watcher, rx))
    }
}
