//! Interpreter relay server.
//!
//! Matches deaf users with available sign-language interpreters and relays
//! WebRTC call signaling between them over WebSocket.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌───────────────────────────────────────────────────────┐
//!                  │                   INTERPRETER RELAY                    │
//!                  │                                                        │
//!   WebSocket      │  ┌─────────┐   ┌───────────┐   ┌────────────────────┐  │
//!   ───────────────┼─▶│  http   │──▶│ websocket │──▶│   broker (actor)   │  │
//!                  │  │ server  │   │  reader   │   │  session store     │  │
//!                  │  └─────────┘   └───────────┘   │  matchmaking       │  │
//!                  │                                │  call relay        │  │
//!   notices        │  ┌───────────┐  ┌──────────┐   └─────────┬──────────┘  │
//!   ◀──────────────┼──│ websocket │◀─│ channel  │◀────────────┘             │
//!                  │  │  writer   │  │   map    │                           │
//!                  │  └───────────┘  └──────────┘                           │
//!                  │                                                        │
//!                  │  sweeper / status timers ──▶ broker queue              │
//!                  │  config (watch + swap) · observability · lifecycle     │
//!                  └───────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use interpreter_relay::broker::{Broker, BrokerHandle};
use interpreter_relay::config::{self, watcher, ConfigWatcher};
use interpreter_relay::health::{LivenessSweeper, StatusReporter};
use interpreter_relay::lifecycle::{wait_for_signal, Shutdown};
use interpreter_relay::net::{listener, ChannelMap};
use interpreter_relay::observability::{logging, metrics};
use interpreter_relay::http::{AppState, HttpServer};

#[derive(Parser)]
#[command(name = "interpreter-relay", version, about)]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let relay_config = config::load_or_default(args.config.as_deref())?;

    logging::init_logging(&relay_config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "interpreter-relay starting");
    tracing::info!(
        bind_address = %relay_config.listener.bind_address,
        max_connections = relay_config.listener.max_connections,
        sweeper_interval_secs = relay_config.sweeper.interval_secs,
        "Configuration loaded"
    );

    if relay_config.observability.metrics_enabled {
        match relay_config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Metrics disabled");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %relay_config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = listener::bind(&relay_config.listener).await?;
    let shutdown = Shutdown::new();
    let shared = config::shared(relay_config);

    // Hot reload; the watcher must stay alive for the life of the process.
    let _watcher = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            tokio::spawn(watcher::apply_updates(shared.clone(), updates, shutdown.subscribe()));
            match watcher.run() {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    tracing::warn!(error = %e, "Config watcher unavailable, reload disabled");
                    None
                }
            }
        }
        None => None,
    };

    let channels = ChannelMap::new(shared.load().listener.max_connections);
    let (broker, broker_task) = BrokerHandle::spawn(Broker::new(channels.clone()), shutdown.subscribe());

    tokio::spawn(LivenessSweeper::new(broker.clone(), shared.clone()).run(shutdown.subscribe()));
    tokio::spawn(
        StatusReporter::new(broker.clone(), channels.clone(), shared.clone()).run(shutdown.subscribe()),
    );

    let grace = Duration::from_secs(shared.load().timeouts.shutdown_grace_secs);
    let server = HttpServer::new(AppState::new(broker, channels.clone(), shared));
    let mut server_task = tokio::spawn(server.run(listener, shutdown.clone()));

    tokio::select! {
        _ = wait_for_signal(shutdown.clone()) => {}
        result = &mut server_task => {
            shutdown.trigger();
            return match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e.into()),
                Err(e) => Err(e.into()),
            };
        }
    }

    // The broker broadcasts the shutdown notice before exiting; closing the
    // channels afterwards lets every writer flush it and send a close frame.
    let _ = broker_task.await;
    channels.close_all();

    match tokio::time::timeout(grace, server_task).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "HTTP server error during shutdown"),
        Ok(Err(e)) => tracing::error!(error = %e, "HTTP server task failed"),
        Err(_) => tracing::warn!(grace_secs = grace.as_secs(), "Connections still open after grace period"),
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
