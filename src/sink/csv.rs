//! CSV persistence sink

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::telemetry::TelemetryRecord;

use super::schema::SchemaVersion;

/// Append-only CSV store
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
    schema: SchemaVersion,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>, schema: SchemaVersion) -> Self {
        Self {
            path: path.into(),
            schema,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema(&self) -> SchemaVersion {
        self.schema
    }

    /// Create the store with its header if it does not exist yet
    ///
    /// Returns `true` if the file was created. An existing store is never
    /// truncated or rewritten.
    pub async fn ensure_initialized(&self) -> Result<bool> {
        let path = self.path.clone();
        let header = self.schema.header_line();

        let created = run_blocking(move || create_with_header(&path, &header)).await?;
        if created {
            tracing::info!(path = %self.path.display(), schema = %self.schema, "Created log file");
        }
        Ok(created)
    }

    /// Append one record, reporting but never propagating failures
    ///
    /// Returns whether the row was written.
    pub async fn append(&self, record: &TelemetryRecord) -> bool {
        match self.try_append(record).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to write telemetry row"
                );
                false
            }
        }
    }

    /// Append one record
    ///
    /// If the store has gone missing since startup it is recreated with its header.
    pub async fn try_append(&self, record: &TelemetryRecord) -> Result<()> {
        let path = self.path.clone();
        let header = self.schema.header_line();
        let row = self.schema.format_row(record);

        run_blocking(move || append_row(&path, &header, &row)).await
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> std::io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Persistence(e.to_string()))?
        .map_err(|e| Error::Persistence(e.to_string()))
}

fn create_with_header(path: &Path, header: &str) -> std::io::Result<bool> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e),
    };

    write_unit(&mut file, header)?;
    Ok(true)
}

fn append_row(path: &Path, header: &str, row: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().append(true).create(true).open(path)?;

    if file.metadata()?.len() == 0 {
        let mut unit = String::with_capacity(header.len() + row.len());
        unit.push_str(header);
        unit.push_str(row);
        write_unit(&mut file, &unit)
    } else {
        write_unit(&mut file, row)
    }
}

fn write_unit(file: &mut File, data: &str) -> std::io::Result<()> {
    file.write_all(data.as_bytes())?;
    file.sync_data()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::telemetry::decode;

    fn read(path: &Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[tokio::test]
    async fn test_ensure_initialized_creates_header() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("log.csv"), SchemaVersion::Extended);

        assert!(sink.ensure_initialized().await.unwrap());
        assert_eq!(read(sink.path()), SchemaVersion::Extended.header_line());
    }

    #[tokio::test]
    async fn test_ensure_initialized_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("log.csv"), SchemaVersion::Basic);

        sink.ensure_initialized().await.unwrap();
        assert!(sink.append(&TelemetryRecord::default()).await);
        let before = read(sink.path());

        assert!(!sink.ensure_initialized().await.unwrap());
        assert_eq!(read(sink.path()), before);
    }

    #[tokio::test]
    async fn test_existing_store_is_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        std::fs::write(&path, "legacy,header\n1,2\n").unwrap();

        let sink = CsvSink::new(&path, SchemaVersion::Extended);
        assert!(!sink.ensure_initialized().await.unwrap());
        assert_eq!(read(&path), "legacy,header\n1,2\n");
    }

    #[tokio::test]
    async fn test_append_partial_record() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("log.csv"), SchemaVersion::Extended);
        sink.ensure_initialized().await.unwrap();

        let record = decode(r#"{"timestamp":1,"temp":20,"accel":[0,0,1]}"#).unwrap();
        assert!(sink.append(&record).await);

        let content = read(sink.path());
        let rows: Vec<&str> = content.lines().skip(1).collect();
        assert_eq!(rows, vec!["1,20,0,0,0,0,0,1,0,0,0,0,0,0,0,0,0"]);
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("log.csv"), SchemaVersion::Basic);
        sink.ensure_initialized().await.unwrap();

        for ts in 1..=5 {
            let record = TelemetryRecord {
                timestamp: ts as f64,
                ..Default::default()
            };
            assert!(sink.append(&record).await);
        }

        let content = read(sink.path());
        let timestamps: Vec<&str> = content
            .lines()
            .skip(1)
            .map(|l| l.split(',').next().unwrap())
            .collect();
        assert_eq!(timestamps, vec!["1", "2", "3", "4", "5"]);
    }

    #[tokio::test]
    async fn test_append_recreates_missing_store() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("log.csv"), SchemaVersion::Basic);

        assert!(sink.append(&TelemetryRecord::default()).await);

        let content = read(sink.path());
        assert!(content.starts_with("Timestamp,"));
        assert_eq!(content.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_append_never_leaves_partial_row() {
        let dir = tempfile::tempdir().unwrap();
        let schema = SchemaVersion::Extended;
        let sink = CsvSink::new(dir.path().join("log.csv"), schema);
        sink.ensure_initialized().await.unwrap();

        let appends = 20;
        for ts in 0..appends {
            let record = TelemetryRecord {
                timestamp: 1_700_000_000_000.0 + ts as f64,
                temperature: 24.123456,
                lat: 7.873154,
                lon: 80.771842,
                accel: [0.25, -0.5, 9.8],
                rssi: Some(-61.0),
                snr: Some(8.75),
                speed: Some(17.3),
                ..Default::default()
            };
            // Dropped after the first poll, once the write is handed off
            let _ = tokio::time::timeout(Duration::ZERO, sink.append(&record)).await;
        }

        // Handed-off writes still finish on the blocking pool
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let content = read(sink.path());
                if content.lines().count() == appends + 1 && content.ends_with('\n') {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        let content = read(sink.path());

        let mut lines = content.lines();
        assert_eq!(lines.next(), Some(schema.header_line().trim_end()));
        for line in lines {
            assert_eq!(line.split(',').count(), schema.columns().len(), "{line}");
        }
    }

    #[tokio::test]
    async fn test_append_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(
            dir.path().join("missing").join("log.csv"),
            SchemaVersion::Basic,
        );

        assert!(!sink.append(&TelemetryRecord::default()).await);
        assert!(matches!(
            sink.try_append(&TelemetryRecord::default()).await,
            Err(Error::Persistence(_))
        ));
    }
}
