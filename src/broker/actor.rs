//! Broker event loop.
//!
//! # Responsibilities
//! - Own the `Broker` inside one task
//! - Serialize every channel event, timer tick and read query
//! - Keep serving when a handler panics
//!
//! # Design Decisions
//! - Unbounded queue: producers (socket readers) must never block on the core
//! - Queries reply through oneshot channels; a stopped broker yields `None`

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::broker::{Broker, PoolSnapshot, SessionSnapshot};
use crate::observability::metrics;
use crate::session::{PoolStats, SessionId, SessionStore};
use crate::signaling::Transport;

/// Work item for the broker task.
#[derive(Debug)]
pub enum BrokerEvent {
    Connected(SessionId),
    Message { from: SessionId, text: String },
    Disconnected(SessionId),
    Sweep(oneshot::Sender<usize>),
    Stats(oneshot::Sender<PoolStats>),
    Sessions(oneshot::Sender<Vec<SessionSnapshot>>),
    Pools(oneshot::Sender<PoolSnapshot>),
}

impl BrokerEvent {
    fn kind(&self) -> &'static str {
        match self {
            BrokerEvent::Connected(_) => "connected",
            BrokerEvent::Message { .. } => "message",
            BrokerEvent::Disconnected(_) => "disconnected",
            BrokerEvent::Sweep(_) => "sweep",
            BrokerEvent::Stats(_) => "stats",
            BrokerEvent::Sessions(_) => "sessions",
            BrokerEvent::Pools(_) => "pools",
        }
    }
}

/// Cloneable handle for submitting events to the broker task.
#[derive(Debug, Clone)]
pub struct BrokerHandle {
    tx: mpsc::UnboundedSender<BrokerEvent>,
}

impl BrokerHandle {
    /// Move `broker` into its own task. The task exits on shutdown or when
    /// every handle is dropped.
    pub fn spawn<T, S>(broker: Broker<T, S>, shutdown: broadcast::Receiver<()>) -> (Self, JoinHandle<()>)
    where
        T: Transport + 'static,
        S: SessionStore + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(broker, rx, shutdown));
        (Self { tx }, task)
    }

    fn submit(&self, event: BrokerEvent) -> bool {
        let kind = event.kind();
        if self.tx.send(event).is_err() {
            tracing::warn!(kind, "Broker stopped, event dropped");
            return false;
        }
        true
    }

    async fn query<R>(&self, make: impl FnOnce(oneshot::Sender<R>) -> BrokerEvent) -> Option<R> {
        let (reply, rx) = oneshot::channel();
        if !self.submit(make(reply)) {
            return None;
        }
        rx.await.ok()
    }

    pub fn connected(&self, id: SessionId) {
        self.submit(BrokerEvent::Connected(id));
    }

    pub fn message(&self, from: SessionId, text: String) {
        self.submit(BrokerEvent::Message { from, text });
    }

    pub fn disconnected(&self, id: SessionId) {
        self.submit(BrokerEvent::Disconnected(id));
    }

    /// Run a liveness sweep; returns the number of sessions removed.
    pub async fn sweep(&self) -> Option<usize> {
        self.query(BrokerEvent::Sweep).await
    }

    pub async fn stats(&self) -> Option<PoolStats> {
        self.query(BrokerEvent::Stats).await
    }

    pub async fn sessions(&self) -> Option<Vec<SessionSnapshot>> {
        self.query(BrokerEvent::Sessions).await
    }

    pub async fn pools(&self) -> Option<PoolSnapshot> {
        self.query(BrokerEvent::Pools).await
    }
}

async fn run<T, S>(
    mut broker: Broker<T, S>,
    mut events: mpsc::UnboundedReceiver<BrokerEvent>,
    mut shutdown: broadcast::Receiver<()>,
) where
    T: Transport,
    S: SessionStore,
{
    tracing::info!("Broker started");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => dispatch(&mut broker, event),
                None => break,
            },
            _ = shutdown.recv() => {
                let notified = broker.shutdown();
                tracing::info!(notified, "Broker received shutdown signal");
                break;
            }
        }
    }

    tracing::info!("Broker stopped");
}

fn dispatch<T, S>(broker: &mut Broker<T, S>, event: BrokerEvent)
where
    T: Transport,
    S: SessionStore,
{
    let kind = event.kind();
    let started = Instant::now();
    let result = panic::catch_unwind(AssertUnwindSafe(|| match event {
        BrokerEvent::Connected(id) => broker.connect(id),
        BrokerEvent::Message { from, text } => broker.handle_text(&from, &text),
        BrokerEvent::Disconnected(id) => broker.disconnect(&id),
        BrokerEvent::Sweep(reply) => {
            let _ = reply.send(broker.sweep());
        }
        BrokerEvent::Stats(reply) => {
            let _ = reply.send(broker.stats());
        }
        BrokerEvent::Sessions(reply) => {
            let _ = reply.send(broker.sessions());
        }
        BrokerEvent::Pools(reply) => {
            let _ = reply.send(broker.pools());
        }
    }));
    metrics::record_event_duration(kind, started.elapsed());

    if let Err(payload) = result {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        tracing::error!(kind, reason = %reason, "Broker handler panicked, continuing");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;
    use crate::signaling::transport::testing::RecordingTransport;
    use crate::signaling::ServerMessage;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_events_processed_in_order() {
        let transport = Arc::new(RecordingTransport::with_connected(&["U1"]));
        let shutdown = Shutdown::new();
        let (handle, _task) = BrokerHandle::spawn(Broker::new(transport.clone()), shutdown.subscribe());

        let u1 = SessionId::from("U1");
        handle.connected(u1.clone());
        handle.message(
            u1.clone(),
            json!({"event": "login", "data": {"role": "requester"}}).to_string(),
        );

        // A query is answered only after everything queued before it.
        let stats = handle.stats().await.unwrap();
        assert_eq!(stats.sessions, 1);
        assert_eq!(stats.requesters_waiting, 1);
        assert_eq!(
            transport.take_for("U1"),
            vec![
                ServerMessage::Connected { id: u1.clone() },
                ServerMessage::unavailable(),
            ]
        );

        handle.disconnected(u1);
        assert_eq!(handle.stats().await.unwrap(), PoolStats::default());
    }

    #[tokio::test]
    async fn test_sweep_via_handle() {
        let transport = Arc::new(RecordingTransport::with_connected(&["A"]));
        let shutdown = Shutdown::new();
        let (handle, _task) = BrokerHandle::spawn(Broker::new(transport.clone()), shutdown.subscribe());

        handle.connected(SessionId::from("A"));
        transport.disconnect("A");

        assert_eq!(handle.sweep().await, Some(1));
        assert_eq!(handle.stats().await.unwrap().sessions, 0);
    }

    #[tokio::test]
    async fn test_queries_fail_after_shutdown() {
        let transport = Arc::new(RecordingTransport::with_connected(&["A"]));
        let shutdown = Shutdown::new();
        let (handle, task) = BrokerHandle::spawn(Broker::new(transport.clone()), shutdown.subscribe());
        handle.connected(SessionId::from("A"));
        assert!(handle.stats().await.is_some());

        shutdown.trigger();
        task.await.unwrap();

        assert!(handle.stats().await.is_none());
        assert_eq!(
            transport.take_for("A").last(),
            Some(&ServerMessage::Error {
                message: "server shutting down".to_string()
            })
        );
    }
}
