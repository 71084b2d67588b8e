//! Listener registry: the single owner of every live worker.
//!
//! # Responsibilities
//! - Start workers and track their handles (`establish`)
//! - Stop every worker and wait for each acknowledgment (`stop_all`)
//! - Replace the whole generation of workers (`reload`)
//!
//! # Design Decisions
//! - Handles live in a DashMap keyed by listener id; nothing outside the
//!   registry can reach it
//! - A tokio RwLock gates the map's lifecycle: establishes share it, so
//!   independent listeners start in parallel, while `stop_all` takes it
//!   exclusively and never misses a worker that is halfway registered
//! - Reloads are serialized, and each one finishes `stop_all` before any
//!   new worker binds
//! - Each worker task owns a `Deregister` guard; when the task ends for any
//!   reason its handle leaves the map, so no handle outlives its worker

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use futures_util::future::join_all;
use tokio::sync::{Mutex, RwLock};

use crate::config::ListenerSpec;
use crate::http::{ListenerHandle, ListenerId, ListenerInfo, ListenerWorker, WorkerError, WorkerOptions, WorkerState};
use crate::observability::metrics;

type HandleMap = DashMap<ListenerId, ListenerHandle>;

/// Removes a worker's handle when the worker task ends.
struct Deregister {
    workers: Weak<HandleMap>,
    id: ListenerId,
}

impl Drop for Deregister {
    fn drop(&mut self) {
        if let Some(workers) = self.workers.upgrade() {
            if workers.remove(&self.id).is_some() {
                tracing::warn!(listener_id = %self.id, "Listener exited on its own, deregistered");
                metrics::set_live_listeners(workers.len());
            }
        }
    }
}

/// A listener that could not be established during a reload.
#[derive(Debug)]
pub struct EstablishFailure {
    pub listener: String,
    pub port: u16,
    pub error: WorkerError,
}

/// Outcome of one reload.
#[derive(Debug, Default)]
pub struct ReloadReport {
    /// Workers stopped from the previous generation.
    pub stopped: usize,
    /// Workers now serving.
    pub established: Vec<ListenerInfo>,
    /// Per-listener errors; the other listeners were still started.
    pub failures: Vec<EstablishFailure>,
}

impl ReloadReport {
    /// True when every requested listener came up.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Owner of the live listener set.
pub struct ListenerRegistry {
    workers: Arc<HandleMap>,
    gate: RwLock<()>,
    reloads: Mutex<()>,
    options: WorkerOptions,
}

impl ListenerRegistry {
    pub fn new(options: WorkerOptions) -> Self {
        Self {
            workers: Arc::new(DashMap::new()),
            gate: RwLock::new(()),
            reloads: Mutex::new(()),
            options,
        }
    }

    /// Start one worker for `spec` and register its handle.
    ///
    /// Returns once the worker is serving, or with the error that kept it
    /// from binding.
    pub async fn establish(&self, spec: Arc<ListenerSpec>) -> Result<ListenerInfo, WorkerError> {
        let _gate = self.gate.read().await;

        let worker = ListenerWorker::bind(Arc::clone(&spec), self.options).await.map_err(|e| {
            tracing::warn!(listener = %spec.name, port = spec.port, error = %e, "Failed to establish listener");
            metrics::record_bind_failure(&spec.name);
            e
        })?;

        let id = worker.id();
        let guard = Deregister {
            workers: Arc::downgrade(&self.workers),
            id,
        };
        let handle = worker.spawn(guard);
        let info = handle.info();
        self.workers.insert(id, handle);

        let live = self.settle(id);
        metrics::set_live_listeners(self.workers.len());
        if !live {
            tracing::warn!(listener_id = %id, listener = %spec.name, "Listener exited during startup");
            metrics::record_bind_failure(&spec.name);
            return Err(WorkerError::Exited(spec.name.clone()));
        }

        tracing::info!(
            listener_id = %id,
            listener = %info.name,
            address = %info.local_addr,
            tls = info.tls,
            "Listener established"
        );
        Ok(info)
    }

    /// Reconcile one freshly inserted handle with its worker.
    ///
    /// A worker that ended before its handle was inserted had nothing for
    /// its guard to remove; drop the orphan here. Returns whether the worker
    /// is still live.
    fn settle(&self, id: ListenerId) -> bool {
        let dead = match self.workers.get(&id) {
            Some(handle) => handle.is_finished() || handle.state() == WorkerState::Stopped,
            None => return false,
        };
        if dead {
            self.workers.remove(&id);
        }
        !dead
    }

    /// Stop every registered worker and wait until all have acknowledged.
    ///
    /// Returns how many workers were stopped. Calling it with nothing
    /// registered is a no-op.
    pub async fn stop_all(&self) -> usize {
        let _gate = self.gate.write().await;

        let ids: Vec<ListenerId> = self.workers.iter().map(|entry| *entry.key()).collect();
        if ids.is_empty() {
            return 0;
        }
        tracing::info!(count = ids.len(), "Closing all listeners");

        let handles: Vec<ListenerHandle> = ids
            .into_iter()
            .filter_map(|id| self.workers.remove(&id).map(|(_, handle)| handle))
            .collect();
        let stopped = handles.len();

        join_all(handles.into_iter().map(|handle| {
            tracing::debug!(listener_id = %handle.id(), listener = %handle.name(), "Stopping listener");
            handle.stop()
        }))
        .await;

        metrics::set_live_listeners(self.workers.len());
        tracing::info!(stopped, "All listeners closed");
        stopped
    }

    /// Replace the current generation of workers with one built from `specs`.
    ///
    /// Every old worker is confirmed stopped before any new one binds.
    /// A listener that fails to start is reported and skipped; the others
    /// still start.
    pub async fn reload(&self, specs: Vec<ListenerSpec>) -> ReloadReport {
        let _serial = self.reloads.lock().await;
        metrics::record_reload();

        let stopped = self.stop_all().await;

        let attempts = specs.into_iter().map(|spec| {
            let spec = Arc::new(spec);
            async move {
                let result = self.establish(Arc::clone(&spec)).await;
                (spec, result)
            }
        });

        let mut report = ReloadReport {
            stopped,
            ..ReloadReport::default()
        };
        for (spec, result) in join_all(attempts).await {
            match result {
                Ok(info) => report.established.push(info),
                Err(error) => report.failures.push(EstablishFailure {
                    listener: spec.name.clone(),
                    port: spec.port,
                    error,
                }),
            }
        }

        tracing::info!(
            stopped = report.stopped,
            established = report.established.len(),
            failed = report.failures.len(),
            "Reload complete"
        );
        report
    }

    /// Snapshot of live workers, ordered by port.
    pub fn live(&self) -> Vec<ListenerInfo> {
        let mut live: Vec<ListenerInfo> = self.workers.iter().map(|entry| entry.value().info()).collect();
        live.sort_by(|a, b| a.port.cmp(&b.port).then_with(|| a.name.cmp(&b.name)));
        live
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new(WorkerOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BindingSpec;
    use std::net::{IpAddr, Ipv4Addr};

    fn free_port() -> u16 {
        std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
    }

    fn spec(name: &str, port: u16) -> ListenerSpec {
        ListenerSpec::new(name, port)
            .with_address(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .with_binding(BindingSpec::inline("/ping", 200, "pong"))
    }

    #[tokio::test]
    async fn establish_registers_handle() {
        let registry = ListenerRegistry::default();
        let port = free_port();
        let info = registry.establish(Arc::new(spec("a", port))).await.unwrap();

        assert_eq!(info.port, port);
        assert_eq!(info.state, WorkerState::Serving);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.live()[0].id, info.id);

        assert_eq!(registry.stop_all().await, 1);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn stop_all_is_idempotent() {
        let registry = ListenerRegistry::default();
        assert_eq!(registry.stop_all().await, 0);

        registry.establish(Arc::new(spec("a", free_port()))).await.unwrap();
        registry.establish(Arc::new(spec("b", free_port()))).await.unwrap();
        assert_eq!(registry.stop_all().await, 2);
        assert_eq!(registry.stop_all().await, 0);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn failed_establish_leaves_no_handle() {
        let registry = ListenerRegistry::default();
        let holder = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = holder.local_addr().unwrap().port();

        assert!(registry.establish(Arc::new(spec("busy", port))).await.is_err());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn reload_can_rebind_same_ports() {
        let registry = ListenerRegistry::default();
        let ports = [free_port(), free_port()];
        let specs = || ports.iter().map(|&p| spec("gen", p)).collect::<Vec<_>>();

        let first = registry.reload(specs()).await;
        assert!(first.is_complete());
        assert_eq!(first.stopped, 0);

        // Same ports again: only possible if the old generation let go first.
        let second = registry.reload(specs()).await;
        assert!(second.is_complete(), "{:?}", second.failures);
        assert_eq!(second.stopped, 2);
        assert_eq!(registry.len(), 2);

        let old_ids: Vec<_> = first.established.iter().map(|i| i.id).collect();
        assert!(registry.live().iter().all(|i| !old_ids.contains(&i.id)));

        registry.stop_all().await;
    }

    #[tokio::test]
    async fn worker_dead_before_registration_is_not_kept() {
        let registry = ListenerRegistry::default();
        let worker = ListenerWorker::bind(Arc::new(spec("a", free_port())), WorkerOptions::default())
            .await
            .unwrap();
        let id = worker.id();
        // No deregistration guard: the worker ends while nothing tracks it.
        let handle = worker.spawn(());
        handle.abort();
        for _ in 0..100 {
            if handle.is_finished() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(handle.state(), WorkerState::Serving);

        registry.workers.insert(id, handle);
        assert!(!registry.settle(id));
        assert!(registry.is_empty());
        assert!(!registry.settle(id));
    }

    #[tokio::test]
    async fn live_worker_settles() {
        let registry = ListenerRegistry::default();
        let info = registry.establish(Arc::new(spec("a", free_port()))).await.unwrap();
        assert!(registry.settle(info.id));
        assert_eq!(registry.len(), 1);
        registry.stop_all().await;
    }

    #[tokio::test]
    async fn worker_exiting_on_its_own_deregisters() {
        let registry = ListenerRegistry::default();
        let info = registry.establish(Arc::new(spec("a", free_port()))).await.unwrap();

        // Stop the worker directly, bypassing stop_all.
        let ack = registry.workers.get(&info.id).unwrap().request_stop().unwrap();
        ack.await.unwrap();

        let drained = tokio::time::timeout(std::time::Duration::from_secs(2), async {
            while !registry.is_empty() {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(drained.is_ok(), "handle outlived its worker");
        assert_eq!(registry.stop_all().await, 0);
    }
}
