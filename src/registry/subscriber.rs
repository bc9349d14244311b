//! Subscriber handle
//!
//! A subscriber is the pump-facing half of one live connection: an id plus the
//! sending side of a bounded queue drained by that connection's task.

use std::net::SocketAddr;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Utf8Bytes;

use crate::error::{Error, Result};

/// Unique identifier for a connected subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to one connected consumer
#[derive(Debug)]
pub struct Subscriber {
    id: SubscriberId,
    peer_addr: SocketAddr,
    tx: mpsc::Sender<Utf8Bytes>,
    connected_at: Instant,
}

impl Subscriber {
    /// Create a new subscriber handle.
    ///
    /// Returns the handle and the receiver the connection task drains.
    /// `capacity` is the number of messages that may queue before `send` waits.
    pub fn new(
        id: SubscriberId,
        peer_addr: SocketAddr,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<Utf8Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));

        let subscriber = Self {
            id,
            peer_addr,
            tx,
            connected_at: Instant::now(),
        };

        (subscriber, rx)
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// When the connection was accepted
    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }

    /// Whether the connection task is still draining messages
    pub fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Queue one message for delivery.
    ///
    /// Waits while the queue is full; fails once the connection task is gone.
    pub async fn send(&self, payload: Utf8Bytes) -> Result<()> {
        self.tx
            .send(payload)
            .await
            .map_err(|_| Error::SubscriberClosed(self.id))
    }
}
