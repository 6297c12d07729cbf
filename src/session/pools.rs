//! Availability pools.
//!
//! # Responsibilities
//! - Track providers currently available to take a call
//! - Track requesters queued without an assigned provider
//! - Preserve insertion order (oldest-first selection)
//!
//! # Design Decisions
//! - Deque-backed set: pools stay small, so a linear membership scan is
//!   cheaper than keeping a parallel index in sync
//! - Adding to one pool evicts the id from the other

use std::collections::VecDeque;

use crate::session::SessionId;

/// Insertion-ordered set of session ids.
#[derive(Debug, Default, Clone)]
pub struct OrderedSet {
    items: VecDeque<SessionId>,
}

impl OrderedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `id` unless already present. Returns true if it was added.
    pub fn insert(&mut self, id: SessionId) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.items.push_back(id);
        true
    }

    /// Returns true if `id` was present.
    pub fn remove(&mut self, id: &SessionId) -> bool {
        match self.items.iter().position(|item| item == id) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.items.iter().any(|item| item == id)
    }

    /// Oldest member.
    pub fn front(&self) -> Option<&SessionId> {
        self.items.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SessionId> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// ProviderPool and RequesterPool.
#[derive(Debug, Default)]
pub struct AvailabilityPools {
    providers: OrderedSet,
    requesters: OrderedSet,
}

impl AvailabilityPools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_provider(&mut self, id: &SessionId) -> bool {
        self.requesters.remove(id);
        self.providers.insert(id.clone())
    }

    pub fn remove_provider(&mut self, id: &SessionId) -> bool {
        self.providers.remove(id)
    }

    pub fn add_requester(&mut self, id: &SessionId) -> bool {
        self.providers.remove(id);
        self.requesters.insert(id.clone())
    }

    pub fn remove_requester(&mut self, id: &SessionId) -> bool {
        self.requesters.remove(id)
    }

    /// Drop `id` from both pools.
    pub fn evict(&mut self, id: &SessionId) {
        self.providers.remove(id);
        self.requesters.remove(id);
    }

    pub fn providers(&self) -> &OrderedSet {
        &self.providers
    }

    pub fn requesters(&self) -> &OrderedSet {
        &self.requesters
    }
}
