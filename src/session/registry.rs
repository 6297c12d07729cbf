//! Session registry.
//!
//! # Responsibilities
//! - Record every connected participant and its declared role
//! - Hold the identity supplied at login (unvalidated)
//! - Answer lookups by session id

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;
use thiserror::Error;
use uuid::Uuid;

/// Identifier bound to one channel for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh identifier for a new channel.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Declared role of a session.
///
/// Any role string other than the known names (and their legacy aliases)
/// deserializes as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Role {
    /// Offers interpretation (interpreter).
    Provider,
    /// Seeks an interpreter (deaf user).
    Requester,
    Unknown,
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "provider" | "interpreter" | "interprete" => Role::Provider,
            "requester" | "surdo" => Role::Requester,
            _ => Role::Unknown,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::Provider => "provider",
            Role::Requester => "requester",
            Role::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// One connected participant.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: SessionId,
    pub role: Role,
    /// Free-form identity given at login (usually an email).
    pub identity: String,
    pub connected_at: SystemTime,
    pub online: bool,
}

/// Errors from registry lookups.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(SessionId),
}

/// Process-lifetime record of connected sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite the entry for `id`.
    ///
    /// Returns the previous entry, if any.
    pub fn register(&mut self, id: SessionId, role: Role, identity: String) -> Option<Session> {
        let session = Session {
            id: id.clone(),
            role,
            identity,
            connected_at: SystemTime::now(),
            online: true,
        };
        self.sessions.insert(id, session)
    }

    /// Toggle the online flag. Unknown ids are ignored.
    pub fn set_online(&mut self, id: &SessionId, online: bool) {
        if let Some(session) = self.sessions.get_mut(id) {
            session.online = online;
        }
    }

    pub fn get(&self, id: &SessionId) -> Result<&Session, SessionError> {
        self.sessions
            .get(id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))
    }

    /// Role of `id`, if registered.
    pub fn role_of(&self, id: &SessionId) -> Option<Role> {
        self.sessions.get(id).map(|s| s.role)
    }

    pub fn remove(&mut self, id: &SessionId) -> Option<Session> {
        self.sessions.remove(id)
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
