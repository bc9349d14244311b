//! Relay bootstrap
//!
//! Wires the source, store, registry, endpoint and pump together and drives
//! them on the current task until shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::error::Result;
use crate::pump::FanoutPump;
use crate::registry::SubscriberRegistry;
use crate::server::config::RelayConfig;
use crate::server::listener::SubscriptionEndpoint;
use crate::sink::CsvSink;
use crate::source::{SourceAdapter, SourceKind};
use crate::stats::RelayStats;

/// A fully assembled telemetry relay
pub struct TelemetryRelay {
    config: RelayConfig,
    local_addr: SocketAddr,
    endpoint: SubscriptionEndpoint,
    pump: FanoutPump,
    registry: Arc<SubscriberRegistry>,
    stats: Arc<RelayStats>,
}

impl TelemetryRelay {
    /// Bind the subscriber port, prepare the store and open the source.
    ///
    /// The port is bound first so a busy port fails fast, before any
    /// hardware is touched. A missing link falls back to simulation unless
    /// `require_hardware` is set.
    pub async fn bind(config: RelayConfig) -> Result<Self> {
        let registry = Arc::new(SubscriberRegistry::new());
        let stats = Arc::new(RelayStats::new());
        let endpoint =
            SubscriptionEndpoint::bind(&config, Arc::clone(&registry), Arc::clone(&stats)).await?;

        let source = SourceAdapter::open(&config).await?;

        Self::assemble(config, endpoint, source, registry, stats).await
    }

    /// Like [`bind`](Self::bind) but with a caller-supplied source
    pub async fn bind_with_source(config: RelayConfig, source: SourceAdapter) -> Result<Self> {
        let registry = Arc::new(SubscriberRegistry::new());
        let stats = Arc::new(RelayStats::new());
        let endpoint =
            SubscriptionEndpoint::bind(&config, Arc::clone(&registry), Arc::clone(&stats)).await?;

        Self::assemble(config, endpoint, source, registry, stats).await
    }

    async fn assemble(
        config: RelayConfig,
        endpoint: SubscriptionEndpoint,
        source: SourceAdapter,
        registry: Arc<SubscriberRegistry>,
        stats: Arc<RelayStats>,
    ) -> Result<Self> {
        let local_addr = endpoint.local_addr()?;

        let sink = CsvSink::new(&config.log_path, config.schema);
        if let Err(e) = sink.ensure_initialized().await {
            // Appends retry creation, so keep going
            tracing::error!(
                path = %config.log_path.display(),
                error = %e,
                "Failed to initialize log file"
            );
        }

        let pump = FanoutPump::new(source, sink, Arc::clone(&registry), &config)
            .with_stats(Arc::clone(&stats));

        Ok(Self {
            config,
            local_addr,
            endpoint,
            pump,
            registry,
            stats,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    pub fn stats(&self) -> &Arc<RelayStats> {
        &self.stats
    }

    pub fn source_kind(&self) -> SourceKind {
        self.pump.source_kind()
    }

    /// Run until the process is terminated
    pub async fn run(self) {
        self.run_until(std::future::pending()).await
    }

    /// Run until `shutdown` resolves
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let Self {
            config,
            endpoint,
            pump,
            stats,
            ..
        } = self;

        let reporter = if config.stats_interval.is_zero() {
            None
        } else {
            Some(stats.spawn_reporter(config.stats_interval))
        };

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
            }
            _ = endpoint.run() => {}
            _ = pump.run() => {}
        }

        if let Some(handle) = reporter {
            handle.abort();
        }

        stats.snapshot().log();
    }
}
