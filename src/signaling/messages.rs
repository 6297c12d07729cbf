//! Wire schema for channel messages.
//!
//! Every frame is a JSON envelope `{"event": <name>, "data": <payload>}`.
//! Inbound frames are parsed in two stages (envelope, then the payload schema
//! for that event) so a malformed payload can still be attributed to its
//! event name.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;

use crate::session::{Role, SessionId};

/// Errors raised while decoding an inbound frame.
#[derive(Debug, Error)]
pub enum MessageError {
    /// Frame is not a JSON envelope.
    #[error("malformed envelope: {0}")]
    Envelope(#[from] serde_json::Error),

    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// Payload does not match the schema for its event.
    #[error("invalid {event} payload: {source}")]
    InvalidPayload {
        event: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl MessageError {
    /// Canonical event name the error belongs to, when known.
    pub fn event(&self) -> Option<&'static str> {
        match self {
            MessageError::InvalidPayload { event, .. } => Some(*event),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginPayload {
    pub role: Role,
    #[serde(default, alias = "email")]
    pub identity: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CallRequestPayload {
    pub to: SessionId,
    pub from: SessionId,
    pub offer: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CallAnswerPayload {
    pub to: SessionId,
    pub from: SessionId,
    pub answer: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CallDeclinePayload {
    pub to: SessionId,
    pub from: SessionId,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CallEndPayload {
    pub to: SessionId,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IceCandidatePayload {
    pub to: SessionId,
    pub candidate: Value,
}

/// Inbound message from a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Login(LoginPayload),
    ProviderOnline,
    ProviderOffline,
    CallRequest(CallRequestPayload),
    CallAnswer(CallAnswerPayload),
    CallDecline(CallDeclinePayload),
    CallEnd(CallEndPayload),
    IceCandidate(IceCandidatePayload),
    Ping,
}

impl ClientMessage {
    /// Canonical event name, used for logs and metric labels.
    pub fn event(&self) -> &'static str {
        match self {
            ClientMessage::Login(_) => "login",
            ClientMessage::ProviderOnline => "provider-online",
            ClientMessage::ProviderOffline => "provider-offline",
            ClientMessage::CallRequest(_) => "call-request",
            ClientMessage::CallAnswer(_) => "call-answer",
            ClientMessage::CallDecline(_) => "call-decline",
            ClientMessage::CallEnd(_) => "call-end",
            ClientMessage::IceCandidate(_) => "ice-candidate",
            ClientMessage::Ping => "ping",
        }
    }
}

fn payload<T: serde::de::DeserializeOwned>(event: &'static str, data: Value) -> Result<T, MessageError> {
    serde_json::from_value(data).map_err(|source| MessageError::InvalidPayload { event, source })
}

impl FromStr for ClientMessage {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Envelope { event, data } = serde_json::from_str(s)?;

        // Legacy names from the first client release are still accepted.
        let message = match event.as_str() {
            "login" | "user-login" => ClientMessage::Login(payload("login", data)?),
            "provider-online" | "interpreter-online" => ClientMessage::ProviderOnline,
            "provider-offline" | "interpreter-offline" => ClientMessage::ProviderOffline,
            "call-request" | "request-call" => {
                ClientMessage::CallRequest(payload("call-request", data)?)
            }
            "call-answer" | "answer-call" => ClientMessage::CallAnswer(payload("call-answer", data)?),
            "call-decline" | "decline-call" => {
                ClientMessage::CallDecline(payload("call-decline", data)?)
            }
            "call-end" | "end-call" => ClientMessage::CallEnd(payload("call-end", data)?),
            "ice-candidate" => ClientMessage::IceCandidate(payload("ice-candidate", data)?),
            "ping" => ClientMessage::Ping,
            _ => return Err(MessageError::UnknownEvent(event)),
        };
        Ok(message)
    }
}

/// Outbound notice to a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Sent once when the channel opens.
    Connected { id: SessionId },
    InterpreterStatus {
        available: bool,
        id: Option<SessionId>,
    },
    IncomingCall { from: SessionId, offer: Value },
    CallAnswer { from: SessionId, answer: Value },
    CallDeclined { from: SessionId },
    CallEnded { from: SessionId },
    IceCandidate { from: SessionId, candidate: Value },
    Error { message: String },
    Pong,
}

impl ServerMessage {
    /// Availability notice naming `provider`, or "unavailable" when `None`.
    pub fn availability(provider: Option<SessionId>) -> Self {
        ServerMessage::InterpreterStatus {
            available: provider.is_some(),
            id: provider,
        }
    }

    pub fn unavailable() -> Self {
        Self::availability(None)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
