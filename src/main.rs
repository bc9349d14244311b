use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use telemetry_relay::{Error, RelayConfig, SchemaVersion, SourceAdapter, TelemetryRelay};

#[derive(Parser, Debug)]
#[command(
    name = "telemetry-relay",
    version,
    about = "Relay serial telemetry to WebSocket subscribers and a CSV log"
)]
struct Cli {
    /// Address subscribers connect to
    #[arg(long, default_value = "127.0.0.1:8101", env = "TELEMETRY_RELAY_BIND")]
    bind: SocketAddr,

    /// Serial device of the ground station receiver
    #[arg(long, default_value = "/dev/ttyUSB0", env = "TELEMETRY_RELAY_SERIAL_PORT")]
    serial_port: String,

    /// Serial bit rate
    #[arg(long, default_value_t = 9600, env = "TELEMETRY_RELAY_BAUD")]
    baud: u32,

    /// CSV log file
    #[arg(long, default_value = "telemetry_log.csv", env = "TELEMETRY_RELAY_LOG")]
    log: PathBuf,

    /// CSV columns: basic or extended (adds RSSI, SNR, Speed)
    #[arg(long, default_value = "extended", env = "TELEMETRY_RELAY_SCHEMA")]
    schema: SchemaVersion,

    /// Exit instead of simulating when the serial port cannot be opened
    #[arg(long, env = "TELEMETRY_RELAY_REQUIRE_HARDWARE", conflicts_with = "simulate")]
    require_hardware: bool,

    /// Skip the serial port and generate simulated telemetry
    #[arg(long, env = "TELEMETRY_RELAY_SIMULATE")]
    simulate: bool,

    /// Seed for simulated telemetry
    #[arg(long, env = "TELEMETRY_RELAY_SEED")]
    seed: Option<u64>,

    /// Simulated packet interval in milliseconds
    #[arg(long, default_value_t = 1000, env = "TELEMETRY_RELAY_SIM_INTERVAL_MS")]
    sim_interval_ms: u64,

    /// Per-broadcast wait bound in milliseconds
    #[arg(long, default_value_t = 1000, env = "TELEMETRY_RELAY_BROADCAST_TIMEOUT_MS")]
    broadcast_timeout_ms: u64,

    /// Maximum concurrent subscribers (0 = unlimited)
    #[arg(long, default_value_t = 0, env = "TELEMETRY_RELAY_MAX_CONNECTIONS")]
    max_connections: usize,

    /// Seconds between stats log lines (0 = off)
    #[arg(long, default_value_t = 30, env = "TELEMETRY_RELAY_STATS_INTERVAL_SECS")]
    stats_interval_secs: u64,
}

impl Cli {
    fn config(&self) -> RelayConfig {
        let mut config = RelayConfig::with_addr(self.bind)
            .serial(self.serial_port.clone(), self.baud)
            .log(self.log.clone(), self.schema)
            .require_hardware(self.require_hardware)
            .simulation_interval(Duration::from_millis(self.sim_interval_ms))
            .broadcast_timeout(Duration::from_millis(self.broadcast_timeout_ms))
            .max_connections(self.max_connections)
            .stats_interval(Duration::from_secs(self.stats_interval_secs));

        if let Some(seed) = self.seed {
            config = config.simulation_seed(seed);
        }
        config
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    tracing::info!("Starting ground station bridge");

    let bound = if cli.simulate {
        let source = SourceAdapter::simulated(&config);
        TelemetryRelay::bind_with_source(config, source).await
    } else {
        TelemetryRelay::bind(config).await
    };

    let relay = match bound {
        Ok(relay) => relay,
        Err(Error::PortInUse(addr)) => {
            eprintln!(
                "Error: port {} is busy. Stop the process already using it and retry.",
                addr.port()
            );
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        addr = %relay.local_addr(),
        source = %relay.source_kind(),
        log = %relay.config().log_path.display(),
        "Relay running"
    );

    relay
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await;

    tracing::info!("Stopped");
}
