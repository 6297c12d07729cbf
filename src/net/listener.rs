//! TCP listener setup.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Report the bound address (port 0 resolves here)
//!
//! Channel limits are enforced per upgrade by [`ChannelMap`](super::ChannelMap),
//! so accepting stays unbounded for plain HTTP routes.

use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Invalid bind address '{0}'")]
    Address(String),

    #[error("Failed to bind: {0}")]
    Bind(#[from] std::io::Error),
}

/// Bind the configured address.
pub async fn bind(config: &ListenerConfig) -> Result<TcpListener, ListenerError> {
    let addr: SocketAddr = config
        .bind_address
        .parse()
        .map_err(|_| ListenerError::Address(config.bind_address.clone()))?;

    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(
        address = %local_addr,
        max_connections = config.max_connections,
        tls = config.tls.is_some(),
        "Listener bound"
    );

    Ok(listener)
}
