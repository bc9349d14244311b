//! Real-time telemetry relay
//!
//! Bridges one slow upstream sensor link to any number of WebSocket
//! subscribers. Every packet that decodes as a telemetry record is appended to
//! a CSV log and pushed to all connected subscribers; when no hardware is
//! attached the relay generates simulated telemetry instead.
//!
//! # Example
//! ```no_run
//! use telemetry_relay::{RelayConfig, TelemetryRelay};
//!
//! # async fn example() -> telemetry_relay::Result<()> {
//! let config = RelayConfig::default().serial("/dev/ttyACM0", 9600);
//! let relay = TelemetryRelay::bind(config).await?;
//!
//! relay
//!     .run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod pump;
pub mod registry;
pub mod server;
pub mod sink;
pub mod source;
pub mod stats;
pub mod telemetry;

pub use error::{Error, Result};
pub use pump::{BroadcastReport, FanoutPump};
pub use registry::{Subscriber, SubscriberId, SubscriberRegistry};
pub use server::{RelayConfig, SubscriptionEndpoint, TelemetryRelay};
pub use sink::{CsvSink, SchemaVersion};
pub use source::{LiveSource, SimulatedSource, SourceAdapter, SourceKind};
pub use telemetry::{decode, encode, Rejected, TelemetryRecord};
