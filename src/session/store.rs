//! Single stateful component combining the registry and the pools.
//!
//! # Responsibilities
//! - Expose registry CRUD and pool operations behind one interface
//! - Enforce cross-structure invariants (role-gated pools, cascade removal)
//!
//! `SessionStore` is the seam for substituting the in-memory implementation
//! with a test double.

use serde::Serialize;

use crate::session::{AvailabilityPools, Role, Session, SessionError, SessionId, SessionRegistry};

/// Aggregate counts over the registry and pools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub sessions: usize,
    pub providers_available: usize,
    pub requesters_waiting: usize,
}

/// Registry + availability pools.
pub trait SessionStore: Send {
    /// Create or overwrite a session. Idempotent.
    fn register(&mut self, id: SessionId, role: Role, identity: String);

    fn set_online(&mut self, id: &SessionId, online: bool);

    fn get(&self, id: &SessionId) -> Result<&Session, SessionError>;

    /// Remove a session and cascade it out of both pools.
    fn remove(&mut self, id: &SessionId) -> Option<Session>;

    /// Returns true if the id entered ProviderPool.
    fn add_provider(&mut self, id: &SessionId) -> bool;

    fn remove_provider(&mut self, id: &SessionId) -> bool;

    /// Returns true if the id entered RequesterPool.
    fn add_requester(&mut self, id: &SessionId) -> bool;

    fn remove_requester(&mut self, id: &SessionId) -> bool;

    fn is_provider_available(&self, id: &SessionId) -> bool;

    fn is_requester_waiting(&self, id: &SessionId) -> bool;

    /// Oldest-inserted available provider.
    fn oldest_provider(&self) -> Option<SessionId>;

    /// Oldest-inserted queued requester.
    fn oldest_requester(&self) -> Option<SessionId>;

    /// Queued requesters in insertion order.
    fn waiting_requesters(&self) -> Vec<SessionId>;

    /// Available providers in insertion order.
    fn available_providers(&self) -> Vec<SessionId>;

    fn session_ids(&self) -> Vec<SessionId>;

    fn sessions(&self) -> Vec<Session>;

    fn stats(&self) -> PoolStats;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    registry: SessionRegistry,
    pools: AvailabilityPools,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemoryStore {
    fn register(&mut self, id: SessionId, role: Role, identity: String) {
        let previous = self.registry.register(id.clone(), role, identity);
        if previous.is_some_and(|p| p.role != role) {
            self.pools.evict(&id);
        }
    }

    fn set_online(&mut self, id: &SessionId, online: bool) {
        self.registry.set_online(id, online);
    }

    fn get(&self, id: &SessionId) -> Result<&Session, SessionError> {
        self.registry.get(id)
    }

    fn remove(&mut self, id: &SessionId) -> Option<Session> {
        self.pools.evict(id);
        self.registry.remove(id)
    }

    fn add_provider(&mut self, id: &SessionId) -> bool {
        if self.registry.role_of(id) != Some(Role::Provider) {
            tracing::debug!(session_id = %id, "Not a registered provider, pool unchanged");
            return false;
        }
        self.pools.add_provider(id)
    }

    fn remove_provider(&mut self, id: &SessionId) -> bool {
        self.pools.remove_provider(id)
    }

    fn add_requester(&mut self, id: &SessionId) -> bool {
        if self.registry.role_of(id) != Some(Role::Requester) {
            tracing::debug!(session_id = %id, "Not a registered requester, queue unchanged");
            return false;
        }
        self.pools.add_requester(id)
    }

    fn remove_requester(&mut self, id: &SessionId) -> bool {
        self.pools.remove_requester(id)
    }

    fn is_provider_available(&self, id: &SessionId) -> bool {
        self.pools.providers().contains(id)
    }

    fn is_requester_waiting(&self, id: &SessionId) -> bool {
        self.pools.requesters().contains(id)
    }

    fn oldest_provider(&self) -> Option<SessionId> {
        self.pools.providers().front().cloned()
    }

    fn oldest_requester(&self) -> Option<SessionId> {
        self.pools.requesters().front().cloned()
    }

    fn waiting_requesters(&self) -> Vec<SessionId> {
        self.pools.requesters().iter().cloned().collect()
    }

    fn available_providers(&self) -> Vec<SessionId> {
        self.pools.providers().iter().cloned().collect()
    }

    fn session_ids(&self) -> Vec<SessionId> {
        self.registry.ids()
    }

    fn sessions(&self) -> Vec<Session> {
        self.registry.iter().cloned().collect()
    }

    fn stats(&self) -> PoolStats {
        PoolStats {
            sessions: self.registry.len(),
            providers_available: self.pools.providers().len(),
            requesters_waiting: self.pools.requesters().len(),
        }
    }
}
