//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (YAML)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks, all errors collected)
//!     → Settings (validated, immutable)
//!     → handed to the listener registry, one ListenerSpec per worker
//!
//! On file change:
//!     watcher.rs detects a new content hash
//!     → lifecycle::reload loads and validates the new settings
//!     → registry stops every worker, then starts the new generation
//! ```
//!
//! # Design Decisions
//! - Settings are immutable once loaded; changes require full reload
//! - Validation separates syntactic (serde) from semantic checks
//! - A document that fails validation never reaches the registry

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_settings, ConfigError};
pub use schema::{BindingSpec, BodyKind, CertificatePair, ListenerSpec, ResponseHeader, Settings};
pub use validation::ValidationError;
pub use watcher::{ConfigWatcher, FileChangedEvent, WatchError};
