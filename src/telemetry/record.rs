//! Telemetry record type

/// Triaxial sample (x, y, z)
pub type Vector3 = [f64; 3];

/// One validated telemetry sample
///
/// Every numeric field defaults to zero when the source packet omits it.
/// The signal-quality fields stay `None` unless the packet carried them, so
/// re-encoding a record never invents keys the hardware did not send.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TelemetryRecord {
    /// Sample time in milliseconds
    pub timestamp: f64,
    /// Temperature in °C (`temp` on the wire)
    pub temperature: f64,
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
    /// Altitude in meters
    pub alt: f64,
    /// Acceleration (m/s²)
    pub accel: Vector3,
    /// Angular rate (rad/s)
    pub gyro: Vector3,
    /// Magnetic field (µT)
    pub mag: Vector3,
    /// Radio signal strength (dBm)
    pub rssi: Option<f64>,
    /// Radio signal-to-noise ratio (dB)
    pub snr: Option<f64>,
    /// Ground speed
    pub speed: Option<f64>,
}

impl TelemetryRecord {
    /// Signal strength, zero when absent
    pub fn rssi_or_zero(&self) -> f64 {
        self.rssi.unwrap_or(0.0)
    }

    /// Signal-to-noise ratio, zero when absent
    pub fn snr_or_zero(&self) -> f64 {
        self.snr.unwrap_or(0.0)
    }

    /// Speed, zero when absent
    pub fn speed_or_zero(&self) -> f64 {
        self.speed.unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_all_zero() {
        let record = TelemetryRecord::default();

        assert_eq!(record.timestamp, 0.0);
        assert_eq!(record.temperature, 0.0);
        assert_eq!(record.accel, [0.0; 3]);
        assert_eq!(record.gyro, [0.0; 3]);
        assert_eq!(record.mag, [0.0; 3]);
        assert!(record.rssi.is_none());
        assert_eq!(record.rssi_or_zero(), 0.0);
        assert_eq!(record.snr_or_zero(), 0.0);
        assert_eq!(record.speed_or_zero(), 0.0);
    }
}
