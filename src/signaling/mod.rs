//! Call signaling subsystem.
//!
//! # Data Flow
//! ```text
//! text frame
//!     → messages.rs (envelope + payload schema)
//!     → broker (dispatch by event)
//!     → matchmaking.rs (advisory availability notices)
//!     → relay.rs (reservation, offer/answer/decline/end, ICE)
//!     → transport.rs (deliver notices to channels)
//! ```
//!
//! # Design Decisions
//! - Payloads are validated before anything reaches the state machine
//! - Matchmaking never reserves; only a call request does
//! - The core talks to channels only through the `Transport` trait

pub mod matchmaking;
pub mod messages;
pub mod relay;
pub mod transport;

pub use messages::{ClientMessage, MessageError, ServerMessage};
pub use relay::RequestOutcome;
pub use transport::Transport;
