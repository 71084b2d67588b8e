//! Listener worker: one endpoint serving one routing table.
//!
//! # States
//! ```text
//! Starting ──bind ok──▶ Serving ──Stop(own id)──▶ Stopping ──▶ Stopped
//!    │                     │
//!    └──bind error──▶ Stopped ◀──server fault──┘
//! ```
//!
//! # Responsibilities
//! - Build the routing table and bind the endpoint (`Starting`)
//! - Serve until a stop command addressed to this worker arrives
//! - Shut down gracefully within a bounded grace period, then acknowledge
//!
//! # Design Decisions
//! - The worker blocks on its command channel; there is no polling
//! - Commands carry the target id; commands for other ids are ignored
//! - The routing table is built once and shared read-only with every
//!   request task
//! - Termination is always observable: the state channel ends in `Stopped`
//!   and the exit guard passed to `spawn` is dropped when the task ends,
//!   even on panic

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum_server::Handle;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::ListenerSpec;
use crate::net::{Endpoint, ListenerError};
use crate::routing::{RouteError, RoutingTable};

/// Default bound on graceful shutdown before connections are cut.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Unique identifier for a listener worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    /// Generate a new random ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Worker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Starting,
    Serving,
    Stopping,
    Stopped,
}

/// Control message addressed to one worker.
#[derive(Debug)]
pub enum WorkerCommand {
    /// Stop serving; `ack` fires once the endpoint is closed.
    Stop {
        target: ListenerId,
        ack: oneshot::Sender<()>,
    },
}

/// Errors that keep a worker from reaching `Serving`.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("listener {0} exited before it was registered")]
    Exited(String),
}

/// Tunables shared by every worker.
#[derive(Debug, Clone, Copy)]
pub struct WorkerOptions {
    /// How long in-flight requests may run after a stop command.
    pub shutdown_grace: Duration,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

/// Read-only description of a live worker.
#[derive(Debug, Clone)]
pub struct ListenerInfo {
    pub id: ListenerId,
    pub name: String,
    pub port: u16,
    pub local_addr: SocketAddr,
    pub tls: bool,
    pub bindings: usize,
    pub state: WorkerState,
}

/// A worker that has bound its endpoint but not yet started serving.
pub struct ListenerWorker {
    id: ListenerId,
    spec: Arc<ListenerSpec>,
    table: Arc<RoutingTable>,
    endpoint: Endpoint,
    options: WorkerOptions,
}

impl ListenerWorker {
    /// `Starting`: compile the routing table and bind the endpoint.
    pub async fn bind(spec: Arc<ListenerSpec>, options: WorkerOptions) -> Result<Self, WorkerError> {
        let id = ListenerId::new();
        tracing::debug!(
            listener_id = %id,
            listener = %spec.name,
            bindings = spec.bindings.len(),
            "Configuring content bindings"
        );

        let table = Arc::new(RoutingTable::build(&spec)?);
        let endpoint = Endpoint::bind(&spec).await?;

        Ok(Self {
            id,
            spec,
            table,
            endpoint,
            options,
        })
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    /// Move to `Serving` on a new task.
    ///
    /// `exit_guard` is held by the task and dropped when it ends, however
    /// it ends.
    pub fn spawn<G>(self, exit_guard: G) -> ListenerHandle
    where
        G: Send + 'static,
    {
        let (commands_tx, commands_rx) = mpsc::channel(4);
        let (state_tx, state_rx) = watch::channel(WorkerState::Serving);

        let handle = ListenerHandle {
            id: self.id,
            name: self.spec.name.clone(),
            port: self.spec.port,
            local_addr: self.endpoint.local_addr(),
            tls: self.endpoint.is_tls(),
            bindings: self.table.len(),
            commands: commands_tx,
            state: state_rx,
            task: None,
        };

        let task = tokio::spawn(async move {
            let _exit_guard = exit_guard;
            self.run(commands_rx, state_tx).await;
        });

        ListenerHandle {
            task: Some(task),
            ..handle
        }
    }

    async fn run(self, mut commands: mpsc::Receiver<WorkerCommand>, state: watch::Sender<WorkerState>) {
        let id = self.id;
        let name = self.spec.name.clone();
        let grace = self.options.shutdown_grace;
        let server_handle = Handle::new();

        let app = Arc::clone(&self.table)
            .into_router()
            .into_make_service_with_connect_info::<SocketAddr>();
        let mut server = self.endpoint.serve(app, server_handle.clone());

        tracing::info!(
            listener_id = %id,
            listener = %name,
            paths = ?self.table.paths(),
            "Listener serving"
        );

        loop {
            tokio::select! {
                result = &mut server => {
                    // The server never returns on its own unless it failed.
                    match result {
                        Ok(()) => tracing::warn!(listener_id = %id, listener = %name, "Listener exited unexpectedly"),
                        Err(e) => tracing::error!(listener_id = %id, listener = %name, error = %e, "Listener error"),
                    }
                    let _ = state.send(WorkerState::Stopped);
                    return;
                }
                command = commands.recv() => match command {
                    Some(WorkerCommand::Stop { target, ack }) if target == id => {
                        let _ = state.send(WorkerState::Stopping);
                        tracing::info!(listener_id = %id, listener = %name, "Closing listener");
                        server_handle.graceful_shutdown(Some(grace));
                        if let Err(e) = server.await {
                            tracing::warn!(listener_id = %id, listener = %name, error = %e, "Listener error during shutdown");
                        }
                        let _ = state.send(WorkerState::Stopped);
                        let _ = ack.send(());
                        tracing::info!(listener_id = %id, listener = %name, "Listener stopped");
                        return;
                    }
                    Some(WorkerCommand::Stop { target, .. }) => {
                        tracing::debug!(listener_id = %id, target = %target, "Ignoring command for another listener");
                    }
                    None => {
                        // Every handle is gone; nobody can stop us later.
                        let _ = state.send(WorkerState::Stopping);
                        server_handle.graceful_shutdown(Some(grace));
                        let _ = server.await;
                        let _ = state.send(WorkerState::Stopped);
                        tracing::info!(listener_id = %id, listener = %name, "Listener stopped, control channel closed");
                        return;
                    }
                },
            }
        }
    }
}

/// The registry's reference to one live worker.
#[derive(Debug)]
pub struct ListenerHandle {
    id: ListenerId,
    name: String,
    port: u16,
    local_addr: SocketAddr,
    tls: bool,
    bindings: usize,
    commands: mpsc::Sender<WorkerCommand>,
    state: watch::Receiver<WorkerState>,
    task: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Current worker state.
    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// True once the worker task has ended, including by panic.
    ///
    /// A panicking worker never publishes `Stopped`, so `state()` alone can
    /// report a dead worker as `Serving`.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    #[cfg(test)]
    pub(crate) fn abort(&self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    pub fn info(&self) -> ListenerInfo {
        ListenerInfo {
            id: self.id,
            name: self.name.clone(),
            port: self.port,
            local_addr: self.local_addr,
            tls: self.tls,
            bindings: self.bindings,
            state: self.state(),
        }
    }

    /// Deliver a raw command to this worker's channel.
    pub async fn send(&self, command: WorkerCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    /// Ask the worker to stop without waiting for it.
    ///
    /// Returns the acknowledgment receiver, or `None` if the worker is gone
    /// or its command queue is full.
    pub fn request_stop(&self) -> Option<oneshot::Receiver<()>> {
        let (ack, ack_rx) = oneshot::channel();
        self.commands
            .try_send(WorkerCommand::Stop { target: self.id, ack })
            .ok()
            .map(|_| ack_rx)
    }

    /// Stop the worker and wait until it has released its endpoint.
    ///
    /// A worker that already exited counts as stopped.
    pub async fn stop(mut self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        let command = WorkerCommand::Stop {
            target: self.id,
            ack: ack_tx,
        };

        if self.send(command).await {
            // A dropped ack means the worker died mid-shutdown.
            let _ = ack_rx.await;
        }

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(listener_id = %self.id, error = %e, "Listener task failed");
            }
        }
    }
}
