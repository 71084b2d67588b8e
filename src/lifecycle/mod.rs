//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Registry (registry.rs):
//!     establish → ListenerWorker::bind → spawn → handle stored
//!     stop_all  → Stop + ack from every worker → map empty
//!
//! Reload (reload.rs):
//!     FileChangedEvent / SIGHUP → load + validate → registry.reload
//!     (invalid settings stop here; running listeners untouched)
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger → loops exit → stop_all
//! ```
//!
//! # Design Decisions
//! - The registry is the only owner of worker handles
//! - Old generation fully stopped before the new one binds
//! - Shutdown has timeout: each worker's grace period bounds the drain

pub mod registry;
pub mod reload;
pub mod shutdown;
pub mod signals;

pub use registry::{EstablishFailure, ListenerRegistry, ReloadReport};
pub use reload::{ReloadError, Reloader};
pub use shutdown::{Shutdown, ShutdownListener};
