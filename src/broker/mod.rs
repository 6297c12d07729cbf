//! Broker: the single-threaded core.
//!
//! # Data Flow
//! ```text
//! ws task ──connect/message/disconnect──┐
//! sweeper ──sweep───────────────────────┤
//! status  ──stats───────────────────────┼─→ actor.rs (one task, FIFO)
//! http    ──stats/sessions/pools────────┘       │
//!                                               ▼
//!                               Broker (store + transport)
//! ```
//!
//! # Design Decisions
//! - One task owns all session state; every event runs to completion, so
//!   no handler ever sees a half-updated registry or pool
//! - Handlers never await
//! - Malformed frames are rejected here, before the state machine

pub mod actor;

pub use actor::{BrokerEvent, BrokerHandle};

use serde::Serialize;
use std::time::UNIX_EPOCH;

use crate::observability::metrics;
use crate::session::{InMemoryStore, PoolStats, Role, SessionId, SessionStore};
use crate::signaling::{matchmaking, relay, ClientMessage, MessageError, ServerMessage, Transport};

/// One row of the admin session listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub role: Role,
    pub identity: String,
    /// Milliseconds since the Unix epoch.
    pub connected_at: u64,
    pub online: bool,
    pub available: bool,
    pub waiting: bool,
}

/// Pool contents in selection order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoolSnapshot {
    pub providers: Vec<SessionId>,
    pub requesters: Vec<SessionId>,
}

/// Owns the session store and dispatches channel events to it.
pub struct Broker<T, S = InMemoryStore> {
    store: S,
    transport: T,
}

impl<T: Transport> Broker<T> {
    pub fn new(transport: T) -> Self {
        Self::with_store(transport, InMemoryStore::new())
    }
}

impl<T: Transport, S: SessionStore> Broker<T, S> {
    pub fn with_store(transport: T, store: S) -> Self {
        Self { store, transport }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// A channel opened: register it with no role yet and tell it its id.
    pub fn connect(&mut self, id: SessionId) {
        self.store.register(id.clone(), Role::Unknown, String::new());
        self.transport
            .send(&id, ServerMessage::Connected { id: id.clone() });
        tracing::info!(session_id = %id, "Session connected");
    }

    /// Decode and dispatch one text frame.
    pub fn handle_text(&mut self, sender: &SessionId, text: &str) {
        match text.parse::<ClientMessage>() {
            Ok(message) => self.handle_message(sender, message),
            Err(err) => self.reject(sender, err),
        }
    }

    fn reject(&self, sender: &SessionId, err: MessageError) {
        let event = err.event().unwrap_or("unknown");
        tracing::warn!(session_id = %sender, event, error = %err, "Rejected malformed message");
        metrics::record_malformed_message(event);

        if event == "login" {
            self.transport.send(
                sender,
                ServerMessage::Error {
                    message: "Login failed: invalid payload".to_string(),
                },
            );
        }
    }

    pub fn handle_message(&mut self, sender: &SessionId, message: ClientMessage) {
        metrics::record_message(message.event());

        match message {
            ClientMessage::Login(login) => self.login(sender, login.role, login.identity),
            ClientMessage::ProviderOnline => self.provider_online(sender),
            ClientMessage::ProviderOffline => self.provider_offline(sender),
            ClientMessage::CallRequest(request) => {
                relay::request_call(&mut self.store, &self.transport, sender, request);
            }
            ClientMessage::CallAnswer(answer) => relay::answer_call(&self.transport, answer),
            ClientMessage::CallDecline(decline) => {
                relay::decline_call(&mut self.store, &self.transport, sender, decline)
            }
            ClientMessage::CallEnd(end) => {
                relay::end_call(&mut self.store, &self.transport, sender, end)
            }
            ClientMessage::IceCandidate(candidate) => {
                relay::relay_candidate(&self.transport, sender, candidate)
            }
            ClientMessage::Ping => {
                self.transport.send(sender, ServerMessage::Pong);
            }
        }
    }

    fn login(&mut self, id: &SessionId, role: Role, identity: String) {
        tracing::info!(session_id = %id, role = %role, identity = %identity, "Login");
        self.store.register(id.clone(), role, identity);

        match role {
            Role::Requester => matchmaking::on_requester_login(&mut self.store, &self.transport, id),
            Role::Provider => matchmaking::advise_head_of_queue(&self.store, &self.transport),
            Role::Unknown => {}
        }
    }

    fn role_of(&self, id: &SessionId) -> Option<Role> {
        self.store.get(id).ok().map(|s| s.role)
    }

    fn provider_online(&mut self, id: &SessionId) {
        if self.role_of(id) != Some(Role::Provider) {
            tracing::warn!(session_id = %id, "provider-online from non-provider ignored");
            return;
        }
        self.store.add_provider(id);
        self.store.set_online(id, true);
        tracing::info!(session_id = %id, "Provider online");
        matchmaking::broadcast_availability(&self.store, &self.transport);
    }

    fn provider_offline(&mut self, id: &SessionId) {
        if self.role_of(id) != Some(Role::Provider) {
            tracing::warn!(session_id = %id, "provider-offline from non-provider ignored");
            return;
        }
        self.store.remove_provider(id);
        self.store.set_online(id, false);
        tracing::info!(session_id = %id, "Provider offline");
    }

    /// A channel closed: cascade it out of the registry and pools.
    pub fn disconnect(&mut self, id: &SessionId) {
        let Some(session) = self.store.remove(id) else {
            tracing::debug!(session_id = %id, "Disconnect for unknown session");
            return;
        };
        tracing::info!(session_id = %id, role = %session.role, "Session disconnected");

        if session.role == Role::Provider {
            matchmaking::broadcast_availability(&self.store, &self.transport);
        }
    }

    /// Remove every session whose channel no longer exists.
    ///
    /// A swept provider gets the same availability broadcast as a
    /// disconnect; the disconnect event that follows will find nothing.
    pub fn sweep(&mut self) -> usize {
        let mut removed = 0;
        let mut provider_left = false;
        for id in self.store.session_ids() {
            if !self.transport.is_connected(&id) {
                if let Some(session) = self.store.remove(&id) {
                    provider_left |= session.role == Role::Provider;
                }
                tracing::debug!(session_id = %id, "Swept stale session");
                removed += 1;
            }
        }
        if provider_left {
            matchmaking::broadcast_availability(&self.store, &self.transport);
        }
        metrics::record_sessions_swept(removed);
        removed
    }

    pub fn stats(&self) -> PoolStats {
        self.store.stats()
    }

    pub fn sessions(&self) -> Vec<SessionSnapshot> {
        let mut rows: Vec<SessionSnapshot> = self
            .store
            .sessions()
            .into_iter()
            .map(|s| SessionSnapshot {
                available: self.store.is_provider_available(&s.id),
                waiting: self.store.is_requester_waiting(&s.id),
                connected_at: s
                    .connected_at
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_millis() as u64,
                online: s.online,
                identity: s.identity,
                role: s.role,
                id: s.id,
            })
            .collect();
        rows.sort_by(|a, b| a.connected_at.cmp(&b.connected_at).then_with(|| a.id.cmp(&b.id)));
        rows
    }

    pub fn pools(&self) -> PoolSnapshot {
        PoolSnapshot {
            providers: self.store.available_providers(),
            requesters: self.store.waiting_requesters(),
        }
    }

    /// Tell every live channel the server is going away.
    pub fn shutdown(&self) -> usize {
        self.transport.broadcast(ServerMessage::Error {
            message: "server shutting down".to_string(),
        })
    }
}
