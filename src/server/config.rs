//! Relay configuration

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::sink::SchemaVersion;

/// Default WebSocket port for subscribers
pub const DEFAULT_PORT: u16 = 8101;

/// Default upstream bit rate
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Relay configuration options
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the subscription endpoint binds to
    pub bind_addr: SocketAddr,

    /// Serial device path of the upstream link
    pub serial_port: String,

    /// Upstream bit rate
    pub baud_rate: u32,

    /// Serial read timeout
    pub read_timeout: Duration,

    /// Wait after opening the link before its input buffer is cleared
    /// (boards commonly reset when the port opens)
    pub settle_delay: Duration,

    /// Fail startup instead of simulating when the link cannot be opened
    pub require_hardware: bool,

    /// Packet interval of the simulated source
    pub simulation_interval: Duration,

    /// Fixed seed for the simulated source (None = OS entropy)
    pub simulation_seed: Option<u64>,

    /// Pump sleep between polls of the live source
    pub idle_interval: Duration,

    /// Upper bound on one broadcast across all subscribers
    pub broadcast_timeout: Duration,

    /// Per-subscriber outbound queue depth
    pub subscriber_queue: usize,

    /// Maximum concurrent subscribers (0 = unlimited)
    pub max_connections: usize,

    /// CSV store path
    pub log_path: PathBuf,

    /// CSV column set
    pub schema: SchemaVersion,

    /// Stats log interval (zero disables)
    pub stats_interval: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            serial_port: "/dev/ttyUSB0".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: Duration::from_secs(2),
            settle_delay: Duration::from_secs(2),
            require_hardware: false,
            simulation_interval: Duration::from_secs(1),
            simulation_seed: None,
            idle_interval: Duration::from_millis(10),
            broadcast_timeout: Duration::from_secs(1),
            subscriber_queue: 32,
            max_connections: 0, // Unlimited
            log_path: PathBuf::from("telemetry_log.csv"),
            schema: SchemaVersion::Extended,
            stats_interval: Duration::from_secs(30),
        }
    }
}

impl RelayConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the serial device and bit rate
    pub fn serial(mut self, port: impl Into<String>, baud_rate: u32) -> Self {
        self.serial_port = port.into();
        self.baud_rate = baud_rate;
        self
    }

    /// Set the post-open settle delay
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Refuse to start without hardware
    pub fn require_hardware(mut self, required: bool) -> Self {
        self.require_hardware = required;
        self
    }

    /// Set the simulated packet interval
    pub fn simulation_interval(mut self, interval: Duration) -> Self {
        self.simulation_interval = interval;
        self
    }

    /// Seed the simulated source
    pub fn simulation_seed(mut self, seed: u64) -> Self {
        self.simulation_seed = Some(seed);
        self
    }

    /// Set the live-source idle interval
    pub fn idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval = interval;
        self
    }

    /// Set the broadcast timeout
    pub fn broadcast_timeout(mut self, timeout: Duration) -> Self {
        self.broadcast_timeout = timeout;
        self
    }

    /// Set per-subscriber queue depth (at least 1)
    pub fn subscriber_queue(mut self, depth: usize) -> Self {
        self.subscriber_queue = depth.max(1);
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the CSV store path and schema
    pub fn log(mut self, path: impl Into<PathBuf>, schema: SchemaVersion) -> Self {
        self.log_path = path.into();
        self.schema = schema;
        self
    }

    /// Set stats interval
    pub fn stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();

        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.read_timeout, Duration::from_secs(2));
        assert_eq!(config.simulation_interval, Duration::from_secs(1));
        assert_eq!(config.broadcast_timeout, Duration::from_secs(1));
        assert_eq!(config.max_connections, 0);
        assert_eq!(config.schema, SchemaVersion::Extended);
        assert!(!config.require_hardware);
        assert!(config.simulation_seed.is_none());
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let config = RelayConfig::with_addr(addr);

        assert_eq!(config.bind_addr.port(), 9000);
    }

    #[test]
    fn test_builder_subscriber_queue_floor() {
        let config = RelayConfig::default().subscriber_queue(0);

        assert_eq!(config.subscriber_queue, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "0.0.0.0:8200".parse().unwrap();
        let config = RelayConfig::default()
            .bind(addr)
            .serial("/dev/ttyACM0", 115_200)
            .require_hardware(true)
            .simulation_interval(Duration::from_millis(100))
            .simulation_seed(7)
            .broadcast_timeout(Duration::from_millis(250))
            .max_connections(4)
            .log("/tmp/flight.csv", SchemaVersion::Basic)
            .stats_interval(Duration::ZERO);

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.serial_port, "/dev/ttyACM0");
        assert_eq!(config.baud_rate, 115_200);
        assert!(config.require_hardware);
        assert_eq!(config.simulation_interval, Duration::from_millis(100));
        assert_eq!(config.simulation_seed, Some(7));
        assert_eq!(config.broadcast_timeout, Duration::from_millis(250));
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.log_path, PathBuf::from("/tmp/flight.csv"));
        assert_eq!(config.schema, SchemaVersion::Basic);
        assert_eq!(config.stats_interval, Duration::ZERO);
    }
}
