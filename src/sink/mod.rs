//! Durable telemetry store
//!
//! One append-only CSV file with a fixed header. Every append is a single
//! blocking write run on the blocking pool, so a row is either fully written
//! or not written at all, even when the caller is cancelled mid-append.

pub mod csv;
pub mod schema;

pub use self::csv::CsvSink;
pub use schema::SchemaVersion;
