//! Upstream telemetry sources
//!
//! The relay has exactly one source, chosen once at startup:
//! - [`LiveSource`]: line reader over the serial link, never waits
//! - [`SimulatedSource`]: paced generator used when the link cannot be opened

pub mod link;
pub mod live;
pub mod simulated;

pub use link::{Link, SerialLink};
pub use live::LiveSource;
pub use simulated::SimulatedSource;

use crate::error::{Error, Result};
use crate::server::config::RelayConfig;

/// Which variant a [`SourceAdapter`] is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Live,
    Simulated,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Live => write!(f, "live"),
            SourceKind::Simulated => write!(f, "simulated"),
        }
    }
}

/// The single upstream source
pub enum SourceAdapter {
    Live(LiveSource),
    Simulated(SimulatedSource),
}

impl SourceAdapter {
    /// Open the live link, falling back to simulation if it is unavailable.
    ///
    /// With `require_hardware` set the fallback is disabled and the open
    /// failure is returned as [`Error::TransportUnavailable`].
    pub async fn open(config: &RelayConfig) -> Result<Self> {
        match LiveSource::open(config).await {
            Ok(live) => {
                tracing::info!(
                    port = %config.serial_port,
                    baud_rate = config.baud_rate,
                    "Connected to serial port"
                );
                Ok(SourceAdapter::Live(live))
            }
            Err(e) if config.require_hardware => Err(Error::TransportUnavailable(format!(
                "{}: {}",
                config.serial_port, e
            ))),
            Err(e) => {
                tracing::warn!(
                    port = %config.serial_port,
                    error = %e,
                    "Could not open serial port, starting in simulation mode"
                );
                Ok(Self::simulated(config))
            }
        }
    }

    /// Simulated source from config
    pub fn simulated(config: &RelayConfig) -> Self {
        SourceAdapter::Simulated(SimulatedSource::new(
            config.simulation_interval,
            config.simulation_seed,
        ))
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            SourceAdapter::Live(_) => SourceKind::Live,
            SourceAdapter::Simulated(_) => SourceKind::Simulated,
        }
    }

    /// Next raw packet, if any
    ///
    /// Returns immediately for the live variant; the simulated variant waits
    /// for its next tick.
    pub async fn poll(&mut self) -> Option<String> {
        match self {
            SourceAdapter::Live(source) => source.poll(),
            SourceAdapter::Simulated(source) => source.poll().await,
        }
    }

    /// Whether the pump must sleep between polls to avoid spinning
    pub fn needs_idle_pacing(&self) -> bool {
        matches!(self, SourceAdapter::Live(_))
    }
}

impl From<LiveSource> for SourceAdapter {
    fn from(source: LiveSource) -> Self {
        SourceAdapter::Live(source)
    }
}

impl From<SimulatedSource> for SourceAdapter {
    fn from(source: SimulatedSource) -> Self {
        SourceAdapter::Simulated(source)
    }
}
