//! Transport abstraction used by the signaling core.
//!
//! The core never touches sockets. It delivers notices through this trait,
//! which the WebSocket channel map implements in production and a recording
//! double implements in tests.

use crate::session::SessionId;
use crate::signaling::ServerMessage;

pub trait Transport: Send + Sync {
    /// Deliver `message` to one channel.
    ///
    /// Returns false when `to` has no live channel; the message is dropped.
    fn send(&self, to: &SessionId, message: ServerMessage) -> bool;

    /// Deliver `message` to every live channel. Returns the delivery count.
    fn broadcast(&self, message: ServerMessage) -> usize;

    /// Whether a live channel exists for `id`.
    fn is_connected(&self, id: &SessionId) -> bool;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn send(&self, to: &SessionId, message: ServerMessage) -> bool {
        (**self).send(to, message)
    }

    fn broadcast(&self, message: ServerMessage) -> usize {
        (**self).broadcast(message)
    }

    fn is_connected(&self, id: &SessionId) -> bool {
        (**self).is_connected(id)
    }
}
