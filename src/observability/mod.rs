//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Router / App / HttpServer produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!     → tracing.rs (per-request spans with correlation IDs)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows into every span
//! - Metrics are cheap (atomic increments) and inert without an exporter

pub mod logging;
pub mod metrics;
pub mod tracing;
