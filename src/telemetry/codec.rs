//! JSON line codec for telemetry packets
//!
//! Decoding is strict about syntax and lenient about content: anything that is
//! not a well-formed JSON object is rejected, while missing or oddly typed
//! fields inside a valid object fall back to zero.

use serde_json::{json, Map, Value};

use super::record::{TelemetryRecord, Vector3};

/// Reason a packet was dropped by [`decode`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejected {
    /// Packet was empty
    Empty,
    /// Packet does not start with `{` or is not a JSON object
    NotAnObject,
    /// Packet is not well-formed JSON
    Syntax(String),
}

impl std::fmt::Display for Rejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejected::Empty => write!(f, "empty packet"),
            Rejected::NotAnObject => write!(f, "packet is not a JSON object"),
            Rejected::Syntax(msg) => write!(f, "malformed JSON: {}", msg),
        }
    }
}

impl std::error::Error for Rejected {}

/// Parse one raw packet into a record
pub fn decode(raw: &str) -> Result<TelemetryRecord, Rejected> {
    if raw.is_empty() {
        return Err(Rejected::Empty);
    }
    if !raw.starts_with('{') {
        return Err(Rejected::NotAnObject);
    }

    let value: Value = serde_json::from_str(raw).map_err(|e| Rejected::Syntax(e.to_string()))?;
    let Value::Object(fields) = value else {
        return Err(Rejected::NotAnObject);
    };

    Ok(TelemetryRecord {
        timestamp: scalar(&fields, "timestamp"),
        temperature: scalar(&fields, "temp"),
        lat: scalar(&fields, "lat"),
        lon: scalar(&fields, "lon"),
        alt: scalar(&fields, "alt"),
        accel: vector(&fields, "accel"),
        gyro: vector(&fields, "gyro"),
        mag: vector(&fields, "mag"),
        rssi: optional(&fields, "rssi"),
        snr: optional(&fields, "snr"),
        speed: optional(&fields, "speed"),
    })
}

/// Serialize a record to its canonical JSON line (no trailing newline)
pub fn encode(record: &TelemetryRecord) -> String {
    let mut value = json!({
        "timestamp": record.timestamp,
        "temp": record.temperature,
        "lat": record.lat,
        "lon": record.lon,
        "alt": record.alt,
        "accel": record.accel,
        "gyro": record.gyro,
        "mag": record.mag,
    });

    if let Value::Object(ref mut fields) = value {
        for (key, field) in [
            ("rssi", record.rssi),
            ("snr", record.snr),
            ("speed", record.speed),
        ] {
            if let Some(v) = field {
                fields.insert(key.to_string(), json!(v));
            }
        }
    }

    value.to_string()
}

fn scalar(fields: &Map<String, Value>, key: &str) -> f64 {
    optional(fields, key).unwrap_or(0.0)
}

fn optional(fields: &Map<String, Value>, key: &str) -> Option<f64> {
    match fields.get(key) {
        None | Some(Value::Null) => None,
        Some(value) => Some(coerce(value)),
    }
}

fn vector(fields: &Map<String, Value>, key: &str) -> Vector3 {
    let mut out = [0.0; 3];
    if let Some(Value::Array(items)) = fields.get(key) {
        for (slot, item) in out.iter_mut().zip(items) {
            *slot = coerce(item);
        }
    }
    out
}

fn coerce(value: &Value) -> f64 {
    let v = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };
    // JSON has no NaN/inf, keep re-encoding lossless
    if v.is_finite() {
        v
    } else {
        0.0
    }
}
