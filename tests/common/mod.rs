//! Shared utilities for integration tests.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use interpreter_relay::config::{shared, RelayConfig};
use interpreter_relay::http::{AppState, HttpServer};
use interpreter_relay::net::{listener, ChannelMap};
use interpreter_relay::{Broker, BrokerHandle, Shutdown};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// A relay running on an ephemeral local port.
pub struct TestRelay {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub channels: ChannelMap,
    broker_task: Option<JoinHandle<()>>,
    server_task: Option<JoinHandle<Result<(), std::io::Error>>>,
}

impl TestRelay {
    pub async fn start() -> Self {
        Self::start_with(RelayConfig::default()).await
    }

    pub async fn start_with(mut config: RelayConfig) -> Self {
        config.listener.bind_address = "127.0.0.1:0".into();
        config.observability.metrics_enabled = false;

        let listener = listener::bind(&config.listener).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let shutdown = Shutdown::new();
        let channels = ChannelMap::new(config.listener.max_connections);
        let (broker, broker_task) =
            BrokerHandle::spawn(Broker::new(channels.clone()), shutdown.subscribe());

        let server = HttpServer::new(AppState::new(broker, channels.clone(), shared(config)));
        let server_task = tokio::spawn(server.run(listener, shutdown.clone()));

        Self {
            addr,
            shutdown,
            channels,
            broker_task: Some(broker_task),
            server_task: Some(server_task),
        }
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub async fn client(&self) -> TestClient {
        TestClient::connect(&self.ws_url()).await
    }

    pub async fn stats(&self) -> Value {
        reqwest::get(self.http_url("/api/stats"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    /// Same order as the binary: broker first, then channels, then the server.
    pub async fn stop(&mut self) {
        self.shutdown.trigger();
        if let Some(task) = self.broker_task.take() {
            task.await.unwrap();
        }
        self.channels.close_all();
        if let Some(task) = self.server_task.take() {
            let _ = tokio::time::timeout(Duration::from_secs(5), task).await;
        }
    }
}

/// A WebSocket client speaking the relay envelope format.
pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    pub id: String,
}

impl TestClient {
    /// Connect and consume the `connected` notice.
    pub async fn connect(url: &str) -> Self {
        let (ws, _) = connect_async(url).await.unwrap();
        let mut client = Self {
            ws,
            id: String::new(),
        };
        let data = client.expect("connected").await;
        client.id = data["id"].as_str().unwrap().to_string();
        client
    }

    pub async fn send(&mut self, event: &str, data: Value) {
        let text = json!({ "event": event, "data": data }).to_string();
        self.ws.send(Message::Text(text.into())).await.unwrap();
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.ws.send(Message::Text(text.to_string().into())).await.unwrap();
    }

    pub async fn login(&mut self, role: &str) {
        self.send("login", json!({ "role": role, "identity": format!("{role}@example.com") }))
            .await;
    }

    /// Next text frame as JSON, or `None` on close.
    pub async fn recv(&mut self) -> Option<Value> {
        loop {
            let frame = tokio::time::timeout(RECV_TIMEOUT, self.ws.next())
                .await
                .expect("timed out waiting for a frame");
            match frame {
                Some(Ok(Message::Text(text))) => {
                    return Some(serde_json::from_str(text.as_str()).unwrap())
                }
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return None,
                Some(Ok(_)) => continue,
            }
        }
    }

    /// Next message must be `event`; returns its data.
    pub async fn expect(&mut self, event: &str) -> Value {
        let message = self.recv().await.expect("channel closed");
        assert_eq!(message["event"], event, "unexpected message: {message}");
        message.get("data").cloned().unwrap_or(Value::Null)
    }

    /// Nothing arrives within `ms` milliseconds.
    pub async fn expect_silence(&mut self, ms: u64) {
        if let Ok(frame) = tokio::time::timeout(Duration::from_millis(ms), self.ws.next()).await {
            panic!("expected silence, got {frame:?}");
        }
    }

    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}
