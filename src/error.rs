//! Error types for the telemetry relay
//!
//! Malformed packets are deliberately absent here: the codec reports them through
//! [`Rejected`](crate::telemetry::Rejected) so they never travel the I/O error path.

use std::net::SocketAddr;

use crate::registry::SubscriberId;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Relay error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Upstream link absent or unopenable
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Subscriber port already bound by another process
    #[error("Port {0} is already in use")]
    PortInUse(SocketAddr),

    /// Subscriber port could not be bound for any other reason
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// WebSocket protocol error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Subscriber's outbound queue is gone
    #[error("Subscriber {0} closed")]
    SubscriberClosed(SubscriberId),

    /// Subscriber did not accept a message within the broadcast window
    #[error("Send to subscriber {0} timed out")]
    SendTimeout(SubscriberId),

    /// Durable store append failed
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl Error {
    /// Classify a listener bind failure
    pub(crate) fn bind(addr: SocketAddr, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::AddrInUse {
            Error::PortInUse(addr)
        } else {
            Error::Bind { addr, source }
        }
    }
}
