//! Fan-out pump
//!
//! The pump is the relay's only driver. Each cycle it polls the source once,
//! decodes the packet, then persists and broadcasts it concurrently:
//!
//! ```text
//!   SourceAdapter::poll()
//!          │ raw line
//!          ▼
//!   telemetry::decode() ──Rejected──► dropped
//!          │ record
//!          ├──────────────────────────┐
//!          ▼                          ▼
//!   CsvSink::append()        broadcast(snapshot)
//!                             ├─► Subscriber::send()
//!                             ├─► Subscriber::send()
//!                             └─► ...  (bounded by broadcast_timeout)
//! ```
//!
//! Both side effects of one packet finish before the next poll, so rows and
//! messages keep decode order. Neither side effect can fail the loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_tungstenite::tungstenite::Utf8Bytes;

use crate::error::Error;
use crate::registry::{Subscriber, SubscriberRegistry};
use crate::server::config::RelayConfig;
use crate::sink::CsvSink;
use crate::source::{SourceAdapter, SourceKind};
use crate::stats::RelayStats;
use crate::telemetry::{decode, TelemetryRecord};

/// Per-subscriber outcome of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Subscribers that accepted the message
    pub delivered: usize,
    /// Subscribers whose connection was already gone
    pub failed: usize,
    /// Subscribers still blocked when the timeout elapsed
    pub timed_out: usize,
}

impl BroadcastReport {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed + self.timed_out
    }
}

/// Result of handling one decoded packet
#[derive(Debug, Clone)]
pub struct PacketOutcome {
    pub record: TelemetryRecord,
    /// Whether the row reached the store
    pub persisted: bool,
    /// `None` when nobody was subscribed
    pub broadcast: Option<BroadcastReport>,
}

/// Send one payload to every subscriber concurrently
///
/// Each send runs as its own task. Sends still pending after `timeout` are
/// aborted and counted as timed out; a failing subscriber never affects the
/// others.
pub async fn broadcast(
    subscribers: &[Arc<Subscriber>],
    payload: Utf8Bytes,
    timeout: Duration,
) -> BroadcastReport {
    let mut report = BroadcastReport::default();
    let mut tasks = JoinSet::new();
    let mut pending = HashMap::with_capacity(subscribers.len());

    for subscriber in subscribers {
        // Connection task already gone; nothing to wait for
        if !subscriber.is_connected() {
            tracing::debug!(
                subscriber = %subscriber.id(),
                peer = %subscriber.peer_addr(),
                "Skipping closed subscriber"
            );
            report.failed += 1;
            continue;
        }

        pending.insert(subscriber.id(), Arc::clone(subscriber));

        let subscriber = Arc::clone(subscriber);
        let payload = payload.clone();
        tasks.spawn(async move {
            let id = subscriber.id();
            (id, subscriber.send(payload).await)
        });
    }

    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            biased;

            joined = tasks.join_next() => match joined {
                None => break,
                Some(Ok((id, Ok(())))) => {
                    pending.remove(&id);
                    report.delivered += 1;
                }
                Some(Ok((id, Err(e)))) => {
                    if let Some(subscriber) = pending.remove(&id) {
                        tracing::debug!(
                            subscriber = %id,
                            peer = %subscriber.peer_addr(),
                            error = %e,
                            "Send failed"
                        );
                    }
                    report.failed += 1;
                }
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "Send task aborted");
                    report.failed += 1;
                }
            },
            _ = &mut deadline => {
                report.timed_out = tasks.len();
                for subscriber in pending.values() {
                    let e = Error::SendTimeout(subscriber.id());
                    tracing::debug!(
                        peer = %subscriber.peer_addr(),
                        connected_secs = subscriber.connected_at().elapsed().as_secs(),
                        timeout_ms = timeout.as_millis() as u64,
                        error = %e,
                        "Broadcast send abandoned"
                    );
                }
                tasks.abort_all();
                break;
            }
        }
    }

    report
}

/// The ingest, persist and fan-out loop
pub struct FanoutPump {
    source: SourceAdapter,
    sink: CsvSink,
    registry: Arc<SubscriberRegistry>,
    stats: Arc<RelayStats>,
    broadcast_timeout: Duration,
    idle_interval: Duration,
}

impl FanoutPump {
    pub fn new(
        source: SourceAdapter,
        sink: CsvSink,
        registry: Arc<SubscriberRegistry>,
        config: &RelayConfig,
    ) -> Self {
        Self {
            source,
            sink,
            registry,
            stats: Arc::new(RelayStats::new()),
            broadcast_timeout: config.broadcast_timeout,
            idle_interval: config.idle_interval,
        }
    }

    /// Share an existing stats collector
    pub fn with_stats(mut self, stats: Arc<RelayStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn stats(&self) -> &Arc<RelayStats> {
        &self.stats
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source.kind()
    }

    /// Run until the future is dropped
    pub async fn run(mut self) {
        tracing::info!(source = %self.source.kind(), "Pump started");
        loop {
            self.step().await;
        }
    }

    /// One loop iteration: poll, handle, pace
    pub async fn step(&mut self) -> Option<PacketOutcome> {
        let outcome = match self.source.poll().await {
            Some(raw) => {
                self.stats.record_packet();
                self.process(raw).await
            }
            None => None,
        };

        // The live source never waits on its own
        if self.source.needs_idle_pacing() && !self.idle_interval.is_zero() {
            tokio::time::sleep(self.idle_interval).await;
        }

        outcome
    }

    /// Decode one raw packet, then persist and broadcast it
    ///
    /// Returns `None` if the packet was rejected.
    pub async fn process(&mut self, raw: String) -> Option<PacketOutcome> {
        // Field borrows only: the source is not Sync
        let sink = &self.sink;
        let stats = &self.stats;
        let registry = &self.registry;
        let timeout = self.broadcast_timeout;

        let record = match decode(&raw) {
            Ok(record) => record,
            Err(reason) => {
                stats.record_rejected();
                tracing::debug!(reason = %reason, "Dropped malformed packet");
                return None;
            }
        };

        tracing::trace!(packet = %raw, "Rx");

        let subscribers = registry.snapshot().await;
        let payload = Utf8Bytes::from(raw);

        let fanout = async {
            if subscribers.is_empty() {
                None
            } else {
                Some(broadcast(&subscribers, payload, timeout).await)
            }
        };

        let (persisted, report) = tokio::join!(sink.append(&record), fanout);

        stats.record_write(persisted);
        if let Some(r) = report {
            stats.record_broadcast(r.delivered, r.failed, r.timed_out);
        }

        Some(PacketOutcome {
            record,
            persisted,
            broadcast: report,
        })
    }
}
