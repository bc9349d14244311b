//! Telemetry records and their wire codec
//!
//! Upstream hardware emits one flat JSON object per line. The codec turns that
//! untrusted text into a [`TelemetryRecord`], or rejects it before it can reach
//! the store or any subscriber.

pub mod codec;
pub mod record;

pub use codec::{decode, encode, Rejected};
pub use record::{TelemetryRecord, Vector3};
