//! Call signaling relay.
//!
//! # States
//! ```text
//! Requested → Answered
//! Requested → Declined   (terminal)
//! any       → Ended      (terminal)
//! ICE candidates are relayed at any time.
//! ```
//!
//! # Design Decisions
//! - No call record is kept; an attempt exists only as pool membership plus
//!   the messages in flight
//! - The reservation (provider leaves ProviderPool) happens once, when the
//!   request is processed. That is the only guard against double-booking
//! - Re-adding ids to pools on decline/end is unconditional; set semantics
//!   absorb duplicates
//! - A relay to an id without a live channel is dropped, except for the
//!   initial request, which answers "unavailable"

use crate::observability::metrics;
use crate::session::{Role, SessionId, SessionStore};
use crate::signaling::messages::{
    CallAnswerPayload, CallDeclinePayload, CallEndPayload, CallRequestPayload, IceCandidatePayload,
};
use crate::signaling::{matchmaking, ServerMessage, Transport};

/// Result of a call request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Callee reserved and the offer delivered.
    Reserved,
    /// Callee not available; the sender was told so.
    Rejected,
}

impl RequestOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestOutcome::Reserved => "reserved",
            RequestOutcome::Rejected => "rejected",
        }
    }
}

fn relay<T: Transport + ?Sized>(transport: &T, to: &SessionId, message: ServerMessage, kind: &str) {
    if !transport.send(to, message) {
        tracing::debug!(to = %to, kind, "Relay target has no live channel, dropped");
    }
}

/// Requested: reserve the callee and forward the offer.
pub fn request_call<S, T>(
    store: &mut S,
    transport: &T,
    sender: &SessionId,
    request: CallRequestPayload,
) -> RequestOutcome
where
    S: SessionStore + ?Sized,
    T: Transport + ?Sized,
{
    let CallRequestPayload { to, from, offer } = request;
    tracing::info!(from = %from, to = %to, "Call requested");

    let outcome = if transport.is_connected(&to) && store.is_provider_available(&to) {
        store.remove_provider(&to);
        store.remove_requester(&from);
        transport.send(&to, ServerMessage::IncomingCall { from, offer });
        tracing::info!(to = %to, "Provider reserved, offer delivered");
        RequestOutcome::Reserved
    } else {
        transport.send(sender, ServerMessage::unavailable());
        tracing::warn!(to = %to, "Requested provider not available");
        RequestOutcome::Rejected
    };

    metrics::record_call_request(outcome.as_str());
    outcome
}

/// Answered: relay the answer to the caller. Pools are untouched.
pub fn answer_call<T>(transport: &T, answer: CallAnswerPayload)
where
    T: Transport + ?Sized,
{
    let CallAnswerPayload { to, from, answer } = answer;
    tracing::info!(from = %from, to = %to, "Call answered");
    relay(transport, &to, ServerMessage::CallAnswer { from, answer }, "call-answer");
}

/// Declined: release the provider and re-queue the target.
///
/// The id re-queued is the message's `to` field, as sent by the client.
pub fn decline_call<S, T>(
    store: &mut S,
    transport: &T,
    sender: &SessionId,
    decline: CallDeclinePayload,
) where
    S: SessionStore + ?Sized,
    T: Transport + ?Sized,
{
    let CallDeclinePayload { to, from } = decline;
    tracing::info!(from = %from, to = %to, "Call declined");

    if store.get(sender).map(|s| s.role) == Ok(Role::Provider) {
        store.add_provider(sender);
    }
    store.add_requester(&to);

    relay(transport, &to, ServerMessage::CallDeclined { from }, "call-declined");
    matchmaking::broadcast_availability(&*store, transport);
}

/// Ended: notify the peer and return any provider to the pool.
pub fn end_call<S, T>(store: &mut S, transport: &T, sender: &SessionId, end: CallEndPayload)
where
    S: SessionStore + ?Sized,
    T: Transport + ?Sized,
{
    let CallEndPayload { to } = end;
    tracing::info!(from = %sender, to = %to, "Call ended");

    relay(
        transport,
        &to,
        ServerMessage::CallEnded {
            from: sender.clone(),
        },
        "call-ended",
    );

    for party in [sender, &to] {
        if store.get(party).map(|s| s.role) == Ok(Role::Provider) {
            store.add_provider(party);
        }
    }

    matchmaking::broadcast_availability(&*store, transport);
}

/// Forward an ICE candidate verbatim. Not gated by call state.
pub fn relay_candidate<T>(transport: &T, sender: &SessionId, candidate: IceCandidatePayload)
where
    T: Transport + ?Sized,
{
    let IceCandidatePayload { to, candidate } = candidate;
    relay(
        transport,
        &to,
        ServerMessage::IceCandidate {
            from: sender.clone(),
            candidate,
        },
        "ice-candidate",
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::InMemoryStore;
    use crate::signaling::transport::testing::RecordingTransport;
    use serde_json::json;

    fn id(s: &str) -> SessionId {
        SessionId::from(s)
    }

    /// P1 available, U1 and U2 queued, everyone connected.
    fn setup() -> (InMemoryStore, RecordingTransport) {
        let mut store = InMemoryStore::new();
        let transport = RecordingTransport::with_connected(&["P1", "U1", "U2"]);
        store.register(id("P1"), Role::Provider, String::new());
        store.add_provider(&id("P1"));
        for u in ["U1", "U2"] {
            store.register(id(u), Role::Requester, String::new());
            store.add_requester(&id(u));
        }
        (store, transport)
    }

    fn request(from: &str, to: &str) -> CallRequestPayload {
        CallRequestPayload {
            to: id(to),
            from: id(from),
            offer: json!({"sdp": from}),
        }
    }

    #[test]
    fn test_request_reserves_provider() {
        let (mut store, transport) = setup();

        let outcome = request_call(&mut store, &transport, &id("U1"), request("U1", "P1"));

        assert_eq!(outcome, RequestOutcome::Reserved);
        assert!(!store.is_provider_available(&id("P1")));
        assert!(!store.is_requester_waiting(&id("U1")));
        assert_eq!(
            transport.take_for("P1"),
            vec![ServerMessage::IncomingCall {
                from: id("U1"),
                offer: json!({"sdp": "U1"}),
            }]
        );
    }

    #[test]
    fn test_first_request_wins() {
        let (mut store, transport) = setup();

        let first = request_call(&mut store, &transport, &id("U1"), request("U1", "P1"));
        let second = request_call(&mut store, &transport, &id("U2"), request("U2", "P1"));

        assert_eq!(first, RequestOutcome::Reserved);
        assert_eq!(second, RequestOutcome::Rejected);
        assert_eq!(transport.take_for("P1").len(), 1);
        assert_eq!(transport.take_for("U2"), vec![ServerMessage::unavailable()]);
        // Loser stays queued.
        assert!(store.is_requester_waiting(&id("U2")));
    }

    #[test]
    fn test_request_to_disconnected_provider_rejected() {
        let (mut store, transport) = setup();
        transport.disconnect("P1");

        let outcome = request_call(&mut store, &transport, &id("U1"), request("U1", "P1"));

        assert_eq!(outcome, RequestOutcome::Rejected);
        assert!(store.is_provider_available(&id("P1")));
        assert!(store.is_requester_waiting(&id("U1")));
        assert_eq!(transport.take_for("U1"), vec![ServerMessage::unavailable()]);
    }

    #[test]
    fn test_answer_is_pure_relay() {
        let (mut store, transport) = setup();
        request_call(&mut store, &transport, &id("U1"), request("U1", "P1"));
        transport.clear();

        answer_call(
            &transport,
            CallAnswerPayload {
                to: id("U1"),
                from: id("P1"),
                answer: json!({"sdp": "answer"}),
            },
        );

        assert_eq!(
            transport.take_for("U1"),
            vec![ServerMessage::CallAnswer {
                from: id("P1"),
                answer: json!({"sdp": "answer"}),
            }]
        );
        // Provider stays reserved for the duration of the call.
        assert!(!store.is_provider_available(&id("P1")));
    }

    #[test]
    fn test_decline_releases_and_requeues() {
        let (mut store, transport) = setup();
        request_call(&mut store, &transport, &id("U1"), request("U1", "P1"));
        transport.clear();

        decline_call(
            &mut store,
            &transport,
            &id("P1"),
            CallDeclinePayload {
                to: id("U1"),
                from: id("P1"),
            },
        );

        assert!(store.is_provider_available(&id("P1")));
        assert!(store.is_requester_waiting(&id("U1")));
        assert_eq!(
            transport.take_for("U1"),
            vec![
                ServerMessage::CallDeclined { from: id("P1") },
                ServerMessage::availability(Some(id("P1"))),
            ]
        );
        assert_eq!(
            transport.take_for("U2"),
            vec![ServerMessage::availability(Some(id("P1")))]
        );
    }

    #[test]
    fn test_decline_from_non_provider_does_not_pool_sender() {
        let (mut store, transport) = setup();

        decline_call(
            &mut store,
            &transport,
            &id("U2"),
            CallDeclinePayload {
                to: id("U1"),
                from: id("U2"),
            },
        );

        assert!(!store.is_provider_available(&id("U2")));
        assert!(store.is_requester_waiting(&id("U2")));
    }

    #[test]
    fn test_end_restores_provider_once() {
        let (mut store, transport) = setup();
        request_call(&mut store, &transport, &id("U1"), request("U1", "P1"));
        transport.clear();

        let end = || CallEndPayload { to: id("P1") };
        end_call(&mut store, &transport, &id("U1"), end());
        end_call(&mut store, &transport, &id("U1"), end());

        assert_eq!(store.available_providers(), vec![id("P1")]);
        // Requester is not re-queued by an end.
        assert!(!store.is_requester_waiting(&id("U1")));
        assert_eq!(
            transport.take_for("P1"),
            vec![
                ServerMessage::CallEnded { from: id("U1") },
                ServerMessage::CallEnded { from: id("U1") },
            ]
        );
    }

    #[test]
    fn test_end_by_provider_broadcasts() {
        let (mut store, transport) = setup();
        request_call(&mut store, &transport, &id("U1"), request("U1", "P1"));
        transport.clear();

        end_call(&mut store, &transport, &id("P1"), CallEndPayload { to: id("U1") });

        assert!(store.is_provider_available(&id("P1")));
        assert_eq!(
            transport.take_for("U1"),
            vec![ServerMessage::CallEnded { from: id("P1") }]
        );
        assert_eq!(
            transport.take_for("U2"),
            vec![ServerMessage::availability(Some(id("P1")))]
        );
    }

    #[test]
    fn test_candidate_relayed_from_sender() {
        let (_, transport) = setup();

        relay_candidate(
            &transport,
            &id("P1"),
            IceCandidatePayload {
                to: id("U1"),
                candidate: json!({"candidate": "a=1"}),
            },
        );
        relay_candidate(
            &transport,
            &id("P1"),
            IceCandidatePayload {
                to: id("nobody"),
                candidate: json!(null),
            },
        );

        assert_eq!(
            transport.take_for("U1"),
            vec![ServerMessage::IceCandidate {
                from: id("P1"),
                candidate: json!({"candidate": "a=1"}),
            }]
        );
        assert_eq!(transport.total_sent(), 0);
    }
}
