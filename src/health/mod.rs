//! Background timers.
//!
//! # Data Flow
//! ```text
//! Liveness sweeper (sweeper.rs):
//!     sweeper.interval_secs timer
//!     → BrokerHandle::sweep
//!     → sessions without a channel removed from registry and pools
//!
//! Status reporter (status.rs):
//!     status.interval_secs timer
//!     → BrokerHandle::stats
//!     → log line + pool gauges
//! ```
//!
//! # Design Decisions
//! - Both timers query through the broker queue and never touch state directly
//! - Intervals are read each cycle from the shared config

pub mod status;
pub mod sweeper;

pub use status::StatusReporter;
pub use sweeper::LivenessSweeper;
