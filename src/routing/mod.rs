//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Table Compilation (at worker start):
//!     ListenerSpec.bindings
//!     → binding.rs (typed headers, status, body source)
//!     → router.rs (exact-path HashMap)
//!     → Freeze as immutable RoutingTable, shared via Arc
//!
//! Incoming Request (path)
//!     → router.rs (exact lookup)
//!     → binding.rs (headers, status, body resolved now)
//!     → Response, or 404 when nothing is bound
//! ```
//!
//! # Design Decisions
//! - A table is never patched; new bindings mean a new worker with a new table
//! - Deterministic: same path always reaches the same binding

pub mod binding;
pub mod router;

pub use binding::{BindingHandler, BodyError};
pub use router::{RouteError, RoutingTable};
