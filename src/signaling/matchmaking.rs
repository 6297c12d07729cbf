//! Advisory matchmaking.
//!
//! Matchmaking only tells requesters which provider is free; it never
//! reserves anyone. Reservation happens when a concrete call request is
//! processed (see `relay.rs`).

use crate::observability::metrics;
use crate::session::{SessionId, SessionStore};
use crate::signaling::{ServerMessage, Transport};

/// Handle a requester's login.
///
/// With a provider available the requester is told about the oldest one and
/// nothing is queued. Otherwise the requester joins RequesterPool and is told
/// nobody is available.
pub fn on_requester_login<S, T>(store: &mut S, transport: &T, requester: &SessionId)
where
    S: SessionStore + ?Sized,
    T: Transport + ?Sized,
{
    match store.oldest_provider() {
        Some(provider) => {
            tracing::info!(
                session_id = %requester,
                provider = %provider,
                "Provider available for requester"
            );
            transport.send(requester, ServerMessage::availability(Some(provider)));
        }
        None => {
            store.add_requester(requester);
            tracing::info!(session_id = %requester, "Requester queued");
            transport.send(requester, ServerMessage::unavailable());
        }
    }
}

/// Advise the oldest queued requester of the oldest available provider.
///
/// Runs when a provider logs in. Does nothing unless both pools are
/// non-empty.
pub fn advise_head_of_queue<S, T>(store: &S, transport: &T)
where
    S: SessionStore + ?Sized,
    T: Transport + ?Sized,
{
    if let (Some(requester), Some(provider)) = (store.oldest_requester(), store.oldest_provider()) {
        tracing::info!(
            session_id = %requester,
            provider = %provider,
            "Advising oldest queued requester"
        );
        transport.send(&requester, ServerMessage::availability(Some(provider)));
    }
}

/// Tell every queued requester the current availability.
///
/// Nobody is dequeued. Returns the number of notices delivered.
pub fn broadcast_availability<S, T>(store: &S, transport: &T) -> usize
where
    S: SessionStore + ?Sized,
    T: Transport + ?Sized,
{
    let notice = ServerMessage::availability(store.oldest_provider());
    let waiting = store.waiting_requesters();
    let delivered = waiting
        .iter()
        .filter(|requester| transport.send(requester, notice.clone()))
        .count();

    tracing::debug!(
        waiting = waiting.len(),
        delivered,
        "Availability broadcast"
    );
    metrics::record_availability_broadcast(delivered);
    delivered
}
