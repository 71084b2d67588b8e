//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! ListenerSpec
//!     → worker.rs (Starting: routing table + endpoint bind)
//!     → worker.rs (Serving: axum router on axum-server)
//!     → routing layer answers each request
//!     → worker.rs (Stopping: bounded graceful shutdown, then ack)
//! ```

pub mod worker;

pub use worker::{
    ListenerHandle, ListenerId, ListenerInfo, ListenerWorker, WorkerCommand, WorkerError, WorkerOptions,
    WorkerState,
};
