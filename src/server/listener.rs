//! Subscription endpoint
//!
//! Accepts WebSocket connections and keeps each one registered with the
//! subscriber registry until it disconnects. Subscribers only receive; any
//! inbound data frames are ignored.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Semaphore};
use tokio_tungstenite::tungstenite::{self, Message, Utf8Bytes};

use crate::error::{Error, Result};
use crate::registry::{Subscriber, SubscriberRegistry};
use crate::server::config::RelayConfig;
use crate::stats::RelayStats;

/// WebSocket acceptor feeding the subscriber registry
pub struct SubscriptionEndpoint {
    listener: TcpListener,
    registry: Arc<SubscriberRegistry>,
    stats: Arc<RelayStats>,
    queue_depth: usize,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl SubscriptionEndpoint {
    /// Bind the subscriber port
    ///
    /// Fails with [`Error::PortInUse`] if another process holds the port.
    pub async fn bind(
        config: &RelayConfig,
        registry: Arc<SubscriberRegistry>,
        stats: Arc<RelayStats>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|e| Error::bind(config.bind_addr, e))?;

        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Ok(Self {
            listener,
            registry,
            stats,
            queue_depth: config.subscriber_queue,
            connection_semaphore,
        })
    }

    /// Actual bound address (useful when binding port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the future is dropped
    pub async fn run(self) {
        if let Ok(addr) = self.local_addr() {
            tracing::info!(addr = %addr, "WebSocket server listening");
        }

        loop {
            match self.listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        if let Err(e) = socket.set_nodelay(true) {
            tracing::debug!(peer = %peer_addr, error = %e, "Failed to set TCP_NODELAY");
        }

        let registry = Arc::clone(&self.registry);
        let stats = Arc::clone(&self.stats);
        let queue_depth = self.queue_depth;

        tokio::spawn(async move {
            let _permit = permit;

            if let Err(e) = serve_connection(socket, peer_addr, registry, stats, queue_depth).await
            {
                tracing::debug!(peer = %peer_addr, error = %e, "Connection error");
            }
        });
    }
}

async fn serve_connection(
    socket: TcpStream,
    peer_addr: SocketAddr,
    registry: Arc<SubscriberRegistry>,
    stats: Arc<RelayStats>,
    queue_depth: usize,
) -> Result<()> {
    let ws = tokio_tungstenite::accept_async(socket).await?;
    let (mut outbound, mut inbound) = ws.split();

    let id = registry.next_id();
    let (subscriber, mut rx) = Subscriber::new(id, peer_addr, queue_depth);
    let subscriber = Arc::new(subscriber);
    registry.add(Arc::clone(&subscriber)).await;
    stats.connection_opened();

    let total = registry.len().await;
    tracing::info!(subscriber = %id, peer = %peer_addr, subscribers = total, "Client connected");

    let result = forward_until_closed(&mut outbound, &mut inbound, &mut rx).await;

    // Unconditional; a no-op if something already removed it
    registry.remove(id).await;
    stats.connection_closed();
    let _ = outbound.close().await;

    let remaining = registry.len().await;
    tracing::info!(
        subscriber = %id,
        peer = %subscriber.peer_addr(),
        connected_secs = subscriber.connected_at().elapsed().as_secs(),
        subscribers = remaining,
        "Client disconnected"
    );

    result
}

/// Relay queued payloads to the socket until the peer goes away
async fn forward_until_closed<W, R>(
    outbound: &mut W,
    inbound: &mut R,
    rx: &mut mpsc::Receiver<Utf8Bytes>,
) -> Result<()>
where
    W: Sink<Message, Error = tungstenite::Error> + Unpin,
    R: Stream<Item = std::result::Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        tokio::select! {
            queued = rx.recv() => match queued {
                Some(text) => outbound.send(Message::Text(text)).await?,
                None => return Ok(()),
            },
            frame = inbound.next() => match frame {
                None | Some(Ok(Message::Close(_))) => return Ok(()),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
        }
    }
}
