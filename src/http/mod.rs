//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID, CORS, timeout)
//!     → /ws: websocket.rs (upgrade, channel slot, frame pumps)
//!     → /, /api/*, /health: read-only views via BrokerHandle queries
//!     → /admin/*: admin module (bearer auth)
//! ```

pub mod server;
pub mod websocket;

pub use server::{AppState, HttpServer};
