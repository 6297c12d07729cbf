//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind)
//!     → tls.rs (optional TLS via axum-server)
//!     → HTTP layer; /ws upgrades
//!     → channel.rs (session id + outbound sender, capped)
//! ```
//!
//! # Design Decisions
//! - Each channel holds a semaphore permit for its whole life
//! - Entries are removed by guard drop, so a panicking socket task still cleans up
//! - TLS is optional and handled transparently

pub mod channel;
pub mod listener;
pub mod tls;

pub use channel::{ChannelError, ChannelGuard, ChannelMap, OpenChannel};
