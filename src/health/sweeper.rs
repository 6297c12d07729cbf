//! Liveness sweeper.
//!
//! # Responsibilities
//! - Periodically drop sessions whose channel is gone
//! - Re-read the interval every cycle so reloads apply without restart
//!
//! Runs through the broker queue, so a sweep never interleaves with a
//! message handler.

use std::time::Duration;
use tokio::sync::broadcast;

use crate::broker::BrokerHandle;
use crate::config::SharedConfig;

pub struct LivenessSweeper {
    broker: BrokerHandle,
    config: SharedConfig,
}

impl LivenessSweeper {
    pub fn new(broker: BrokerHandle, config: SharedConfig) -> Self {
        Self { broker, config }
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(self.config.load().sweeper.interval_secs.max(1))
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval().as_secs(),
            "Liveness sweeper starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval()) => {
                    if self.sweep_once().await.is_none() {
                        tracing::warn!("Broker unavailable, sweeper exiting");
                        break;
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Liveness sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// One sweep; `None` if the broker has stopped.
    pub async fn sweep_once(&self) -> Option<usize> {
        let removed = self.broker.sweep().await?;
        if removed > 0 {
            tracing::info!(removed, "Removed inactive sessions");
        } else {
            tracing::debug!("Sweep found no inactive sessions");
        }
        Some(removed)
    }
}
