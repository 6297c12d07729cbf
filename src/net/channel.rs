//! Outbound channel registry.
//!
//! # Responsibilities
//! - Map each session id to the sender feeding its socket writer
//! - Cap concurrent channels at `listener.max_connections`
//! - Remove the entry when the socket task ends, even on panic
//!
//! The broker only ever sees this through [`Transport`].

use std::sync::Arc;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};

use crate::observability::metrics;
use crate::session::SessionId;
use crate::signaling::{ServerMessage, Transport};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("channel limit of {0} reached")]
    Capacity(usize),
}

/// Shared table of open channels.
#[derive(Debug, Clone)]
pub struct ChannelMap {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    channels: DashMap<SessionId, mpsc::UnboundedSender<ServerMessage>>,
    limit: Arc<Semaphore>,
    max_channels: usize,
}

/// A freshly opened channel: the guard keeps it registered, `outbound`
/// yields what the broker sends to it.
#[derive(Debug)]
pub struct OpenChannel {
    pub guard: ChannelGuard,
    pub outbound: mpsc::UnboundedReceiver<ServerMessage>,
}

impl ChannelMap {
    pub fn new(max_channels: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                channels: DashMap::new(),
                limit: Arc::new(Semaphore::new(max_channels)),
                max_channels,
            }),
        }
    }

    /// Register a new channel under a fresh session id.
    ///
    /// Fails immediately rather than waiting when the limit is reached.
    pub fn open(&self) -> Result<OpenChannel, ChannelError> {
        let permit = self
            .inner
            .limit
            .clone()
            .try_acquire_owned()
            .map_err(|_| ChannelError::Capacity(self.inner.max_channels))?;

        let id = SessionId::generate();
        let (tx, outbound) = mpsc::unbounded_channel();
        self.inner.channels.insert(id.clone(), tx);
        metrics::record_channels_open(self.len());

        tracing::debug!(
            session_id = %id,
            available = self.inner.limit.available_permits(),
            "Channel opened"
        );

        Ok(OpenChannel {
            guard: ChannelGuard {
                id,
                map: self.clone(),
                _permit: permit,
            },
            outbound,
        })
    }

    pub fn len(&self) -> usize {
        self.inner.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.channels.is_empty()
    }

    pub fn available(&self) -> usize {
        self.inner.limit.available_permits()
    }

    /// Drop every outbound sender. Writers drain what is queued, then end.
    pub fn close_all(&self) {
        self.inner.channels.clear();
        metrics::record_channels_open(0);
    }

    fn close(&self, id: &SessionId) {
        self.inner.channels.remove(id);
        metrics::record_channels_open(self.len());
    }
}

impl Transport for ChannelMap {
    fn send(&self, to: &SessionId, message: ServerMessage) -> bool {
        match self.inner.channels.get(to) {
            Some(tx) => tx.send(message).is_ok(),
            None => false,
        }
    }

    fn broadcast(&self, message: ServerMessage) -> usize {
        self.inner
            .channels
            .iter()
            .filter(|entry| entry.value().send(message.clone()).is_ok())
            .count()
    }

    fn is_connected(&self, id: &SessionId) -> bool {
        self.inner
            .channels
            .get(id)
            .is_some_and(|tx| !tx.is_closed())
    }
}

/// Keeps one channel registered. Dropping it removes the entry and frees
/// the slot.
#[derive(Debug)]
pub struct ChannelGuard {
    id: SessionId,
    map: ChannelMap,
    _permit: OwnedSemaphorePermit,
}

impl ChannelGuard {
    pub fn id(&self) -> &SessionId {
        &self.id
    }
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        self.map.close(&self.id);
        tracing::trace!(session_id = %self.id, "Channel closed");
    }
}
