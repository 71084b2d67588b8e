//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ListenerSpec (address, port, TLS pair)
//!     → tls.rs (load PEM certificate and key, when enabled)
//!     → listener.rs (bind socket, wrap in axum-server)
//!     → Hand off to the listener worker
//! ```
//!
//! # Design Decisions
//! - TLS material is loaded before the port is bound
//! - TLS is optional and handled transparently

pub mod listener;
pub mod tls;

pub use listener::{Endpoint, ListenerError};
pub use tls::TlsError;
