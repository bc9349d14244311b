//! Counters for the ingest, persistence and fan-out paths

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Live relay counters
///
/// Updated from the pump and connection tasks without locking.
#[derive(Debug)]
pub struct RelayStats {
    started_at: Instant,
    packets_received: AtomicU64,
    packets_rejected: AtomicU64,
    rows_written: AtomicU64,
    write_failures: AtomicU64,
    broadcasts: AtomicU64,
    deliveries: AtomicU64,
    send_failures: AtomicU64,
    send_timeouts: AtomicU64,
    total_connections: AtomicU64,
    active_connections: AtomicU64,
}

impl RelayStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            packets_received: AtomicU64::new(0),
            packets_rejected: AtomicU64::new(0),
            rows_written: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
            broadcasts: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
            send_timeouts: AtomicU64::new(0),
            total_connections: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
        }
    }

    pub fn record_packet(&self) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.packets_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one persistence attempt
    pub fn record_write(&self, ok: bool) {
        if ok {
            self.rows_written.fetch_add(1, Ordering::Relaxed);
        } else {
            self.write_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Count one broadcast and its per-subscriber outcome
    pub fn record_broadcast(&self, delivered: usize, failed: usize, timed_out: usize) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.deliveries.fetch_add(delivered as u64, Ordering::Relaxed);
        self.send_failures.fetch_add(failed as u64, Ordering::Relaxed);
        self.send_timeouts.fetch_add(timed_out as u64, Ordering::Relaxed);
    }

    pub fn connection_opened(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        let _ = self
            .active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(n.saturating_sub(1))
            });
    }

    /// Spawn a task logging a snapshot every `interval`
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn spawn_reporter(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let stats = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                stats.snapshot().log();
            }
        })
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime: self.started_at.elapsed(),
            packets_received: self.packets_received.load(Ordering::Relaxed),
            packets_rejected: self.packets_rejected.load(Ordering::Relaxed),
            rows_written: self.rows_written.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            send_timeouts: self.send_timeouts.load(Ordering::Relaxed),
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
        }
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy of [`RelayStats`] at one instant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub uptime: Duration,
    /// Packets pulled from the source (valid or not)
    pub packets_received: u64,
    /// Packets dropped by the codec
    pub packets_rejected: u64,
    pub rows_written: u64,
    pub write_failures: u64,
    /// Broadcasts with at least one subscriber
    pub broadcasts: u64,
    /// Successful per-subscriber sends
    pub deliveries: u64,
    /// Sends to closed subscribers
    pub send_failures: u64,
    /// Sends cut off by the broadcast timeout
    pub send_timeouts: u64,
    pub total_connections: u64,
    pub active_connections: u64,
}

impl StatsSnapshot {
    /// Packets that decoded successfully
    pub fn packets_accepted(&self) -> u64 {
        self.packets_received.saturating_sub(self.packets_rejected)
    }

    /// Accepted packets per second since startup
    pub fn packet_rate(&self) -> f64 {
        let secs = self.uptime.as_secs_f64();
        if secs > 0.0 {
            self.packets_accepted() as f64 / secs
        } else {
            0.0
        }
    }

    pub fn log(&self) {
        tracing::info!(
            uptime_secs = self.uptime.as_secs(),
            packets = self.packets_received,
            rejected = self.packets_rejected,
            rows = self.rows_written,
            write_failures = self.write_failures,
            broadcasts = self.broadcasts,
            deliveries = self.deliveries,
            send_failures = self.send_failures,
            send_timeouts = self.send_timeouts,
            subscribers = self.active_connections,
            rate = format_args!("{:.2}/s", self.packet_rate()),
            "Relay stats"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zero() {
        let snap = RelayStats::new().snapshot();

        assert_eq!(snap.packets_received, 0);
        assert_eq!(snap.rows_written, 0);
        assert_eq!(snap.broadcasts, 0);
        assert_eq!(snap.active_connections, 0);
    }

    #[test]
    fn test_packet_counters() {
        let stats = RelayStats::new();
        stats.record_packet();
        stats.record_packet();
        stats.record_packet();
        stats.record_rejected();
        stats.record_write(true);
        stats.record_write(false);

        let snap = stats.snapshot();
        assert_eq!(snap.packets_received, 3);
        assert_eq!(snap.packets_rejected, 1);
        assert_eq!(snap.packets_accepted(), 2);
        assert_eq!(snap.rows_written, 1);
        assert_eq!(snap.write_failures, 1);
    }

    #[test]
    fn test_broadcast_counters() {
        let stats = RelayStats::new();
        stats.record_broadcast(2, 1, 0);
        stats.record_broadcast(1, 0, 1);

        let snap = stats.snapshot();
        assert_eq!(snap.broadcasts, 2);
        assert_eq!(snap.deliveries, 3);
        assert_eq!(snap.send_failures, 1);
        assert_eq!(snap.send_timeouts, 1);
    }

    #[test]
    fn test_connection_close_saturates() {
        let stats = RelayStats::new();
        stats.connection_opened();
        stats.connection_closed();
        stats.connection_closed();

        let snap = stats.snapshot();
        assert_eq!(snap.total_connections, 1);
        assert_eq!(snap.active_connections, 0);
    }

    #[test]
    fn test_packet_rate_zero_uptime() {
        let snap = StatsSnapshot::default();
        assert_eq!(snap.packet_rate(), 0.0);
    }
}
