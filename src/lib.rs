//! Mock HTTP API server library.
//!
//! Serves canned responses described by a YAML settings file, one worker
//! per listener, and replaces every worker when the file changes.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::{load_settings, Settings};
pub use lifecycle::{ListenerRegistry, Reloader, Shutdown};
