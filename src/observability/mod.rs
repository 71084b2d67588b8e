//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (stdout, optional log file via logging.rs)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Terminal / log file
//!     → Metrics endpoint (Prometheus scrape, opt-in)
//! ```

pub mod logging;
pub mod metrics;
