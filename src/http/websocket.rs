//! WebSocket channel handling.
//!
//! # Responsibilities
//! - Reserve a channel slot before completing the upgrade
//! - Forward inbound text frames to the broker
//! - Serialize outbound notices onto the socket
//!
//! # Data Flow
//! ```text
//! client ── text frame ──→ reader ──→ BrokerHandle::message
//! client ←─ text frame ─── writer ←── ChannelMap sender ←── Broker
//! ```
//!
//! # Design Decisions
//! - Reader and writer run as separate tasks; whichever ends first stops the other
//! - The channel guard is dropped before the disconnect event is queued, so the
//!   broker never relays to a socket that is already gone
//! - Binary frames are ignored; pings are answered by the protocol layer

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;

use crate::broker::BrokerHandle;
use crate::http::server::AppState;
use crate::net::OpenChannel;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Response {
    let channel = match state.channels.open() {
        Ok(channel) => channel,
        Err(e) => {
            tracing::warn!(peer = %peer, error = %e, "Rejecting WebSocket upgrade");
            return (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response();
        }
    };

    let max_bytes = state.config.load().security.max_message_bytes;
    let broker = state.broker.clone();

    ws.max_message_size(max_bytes)
        .max_frame_size(max_bytes)
        .on_upgrade(move |socket| serve_channel(socket, channel, broker, peer))
}

async fn serve_channel(socket: WebSocket, channel: OpenChannel, broker: BrokerHandle, peer: SocketAddr) {
    let OpenChannel { guard, mut outbound } = channel;
    let id = guard.id().clone();
    tracing::debug!(session_id = %id, peer = %peer, "WebSocket upgraded");

    let (mut sink, mut stream) = socket.split();
    broker.connected(id.clone());

    let writer_id = id.clone();
    let mut writer = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            let text = match message.to_json() {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(session_id = %writer_id, error = %e, "Failed to encode notice");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                return;
            }
        }
        // Sender side closed: server is shutting down.
        let _ = sink.send(Message::Close(None)).await;
    });

    let reader_id = id.clone();
    let reader_broker = broker.clone();
    let mut reader = tokio::spawn(async move {
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    reader_broker.message(reader_id.clone(), text.as_str().to_owned());
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(session_id = %reader_id, error = %e, "WebSocket read error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    drop(guard);
    broker.disconnected(id.clone());
    tracing::debug!(session_id = %id, peer = %peer, "WebSocket closed");
}
