//! Interpreter relay library.

pub mod admin;
pub mod broker;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod session;
pub mod signaling;

pub use broker::{Broker, BrokerHandle};
pub use config::schema::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
