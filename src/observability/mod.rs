//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! broker, signaling, sweeper, channels produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Prometheus scrape on observability.metrics_address
//! ```
//!
//! # Design Decisions
//! - Metric updates are no-ops until the exporter is installed
//! - Request IDs come from tower-http and appear in the trace spans

pub mod logging;
pub mod metrics;
