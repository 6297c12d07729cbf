//! Periodic status report.

use std::time::Duration;
use tokio::sync::broadcast;

use crate::broker::BrokerHandle;
use crate::config::SharedConfig;
use crate::net::ChannelMap;
use crate::observability::metrics;

/// Logs pool sizes on a timer and mirrors them into gauges.
pub struct StatusReporter {
    broker: BrokerHandle,
    channels: ChannelMap,
    config: SharedConfig,
}

impl StatusReporter {
    pub fn new(broker: BrokerHandle, channels: ChannelMap, config: SharedConfig) -> Self {
        Self {
            broker,
            channels,
            config,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            let interval = Duration::from_secs(self.config.load().status.interval_secs.max(1));
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    if !self.report().await {
                        break;
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
    }

    async fn report(&self) -> bool {
        let Some(stats) = self.broker.stats().await else {
            return false;
        };
        metrics::record_pool_stats(&stats);
        metrics::record_channels_open(self.channels.len());

        tracing::info!(
            sessions = stats.sessions,
            providers_available = stats.providers_available,
            requesters_waiting = stats.requesters_waiting,
            channels_open = self.channels.len(),
            "Status"
        );
        true
    }
}
