//! Synthetic telemetry generator
//!
//! Stands in for the hardware link so subscribers and the store keep seeing
//! plausible, continuously moving data when no board is attached.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::telemetry::{encode, TelemetryRecord};

/// Simulated source pacing itself to one packet per interval
pub struct SimulatedSource {
    ticker: Interval,
    rng: StdRng,
    last_timestamp: f64,
}

impl SimulatedSource {
    /// Create a simulated source
    ///
    /// With a seed the jitter sequence is reproducible; otherwise it is seeded
    /// from OS entropy.
    pub fn new(interval: Duration, seed: Option<u64>) -> Self {
        let period = interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            ticker,
            rng,
            last_timestamp: 0.0,
        }
    }

    /// Wait for the next tick, then produce one encoded packet
    pub async fn poll(&mut self) -> Option<String> {
        self.ticker.tick().await;
        let record = self.generate(wall_clock_ms());
        Some(encode(&record))
    }

    /// Synthesize a record for time `now_ms`
    ///
    /// Temperature and position drift sinusoidally with time; inertial, magnetic
    /// and radio fields get uniform jitter. Timestamps never go backwards.
    pub fn generate(&mut self, now_ms: f64) -> TelemetryRecord {
        let t = now_ms.max(self.last_timestamp);
        self.last_timestamp = t;

        let rng = &mut self.rng;
        TelemetryRecord {
            timestamp: t,
            temperature: 25.0 + (t / 10_000.0).sin() * 5.0,
            lat: 7.8731 + (t / 5_000.0).sin() * 0.001,
            lon: 80.7718 + (t / 5_000.0).cos() * 0.001,
            alt: 100.0 + (t % 10_000.0) / 10.0,
            accel: [rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0), 9.8],
            gyro: [
                rng.random_range(-0.1..0.1),
                rng.random_range(-0.1..0.1),
                rng.random_range(-0.1..0.1),
            ],
            mag: [
                rng.random_range(20.0..50.0),
                rng.random_range(20.0..50.0),
                rng.random_range(20.0..50.0),
            ],
            rssi: Some(f64::from(rng.random_range(-90..=-40_i32))),
            snr: Some(rng.random_range(5.0..12.0)),
            speed: Some(rng.random_range(10.0..30.0)),
        }
    }
}

fn wall_clock_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}
