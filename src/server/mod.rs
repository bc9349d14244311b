//! Relay server
//!
//! [`TelemetryRelay`] owns the subscriber port and the pump. Subscribers
//! connect over WebSocket and receive every accepted packet as one text
//! message.

pub mod config;
pub mod listener;
pub mod relay;

pub use config::RelayConfig;
pub use listener::SubscriptionEndpoint;
pub use relay::TelemetryRelay;
