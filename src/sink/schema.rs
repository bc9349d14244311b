//! Store column layout

use std::fmt::Write as _;
use std::str::FromStr;

use crate::telemetry::TelemetryRecord;

const BASIC_COLUMNS: &[&str] = &[
    "Timestamp",
    "Temp_C",
    "Lat",
    "Lon",
    "Alt_m",
    "Accel_X",
    "Accel_Y",
    "Accel_Z",
    "Gyro_X",
    "Gyro_Y",
    "Gyro_Z",
    "Mag_X",
    "Mag_Y",
    "Mag_Z",
];

const EXTENDED_COLUMNS: &[&str] = &[
    "Timestamp",
    "Temp_C",
    "Lat",
    "Lon",
    "Alt_m",
    "Accel_X",
    "Accel_Y",
    "Accel_Z",
    "Gyro_X",
    "Gyro_Y",
    "Gyro_Z",
    "Mag_X",
    "Mag_Y",
    "Mag_Z",
    "RSSI",
    "SNR",
    "Speed",
];

/// Column set written to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaVersion {
    /// Position, environment and inertial columns
    Basic,
    /// Basic plus RSSI, SNR and speed
    #[default]
    Extended,
}

impl SchemaVersion {
    /// Header column names in order
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            SchemaVersion::Basic => BASIC_COLUMNS,
            SchemaVersion::Extended => EXTENDED_COLUMNS,
        }
    }

    /// Header line, newline terminated
    pub fn header_line(self) -> String {
        let mut line = self.columns().join(",");
        line.push('\n');
        line
    }

    /// One data row, newline terminated
    pub fn format_row(self, record: &TelemetryRecord) -> String {
        let mut values = vec![
            record.timestamp,
            record.temperature,
            record.lat,
            record.lon,
            record.alt,
        ];
        values.extend_from_slice(&record.accel);
        values.extend_from_slice(&record.gyro);
        values.extend_from_slice(&record.mag);

        if self == SchemaVersion::Extended {
            values.push(record.rssi_or_zero());
            values.push(record.snr_or_zero());
            values.push(record.speed_or_zero());
        }

        let mut line = String::with_capacity(values.len() * 8);
        for (i, v) in values.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            let _ = write!(line, "{}", v);
        }
        line.push('\n');
        line
    }
}

impl FromStr for SchemaVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" | "v1" => Ok(SchemaVersion::Basic),
            "extended" | "v2" => Ok(SchemaVersion::Extended),
            other => Err(format!("unknown schema version: {}", other)),
        }
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaVersion::Basic => write!(f, "basic"),
            SchemaVersion::Extended => write!(f, "extended"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_counts() {
        assert_eq!(SchemaVersion::Basic.columns().len(), 14);
        assert_eq!(SchemaVersion::Extended.columns().len(), 17);
        assert_eq!(
            SchemaVersion::Extended.columns()[..14],
            *SchemaVersion::Basic.columns()
        );
    }

    #[test]
    fn test_header_line() {
        let header = SchemaVersion::Basic.header_line();
        assert!(header.starts_with("Timestamp,Temp_C,Lat,Lon,Alt_m,Accel_X"));
        assert!(header.ends_with("Mag_Z\n"));
    }

    #[test]
    fn test_row_field_order() {
        let record = TelemetryRecord {
            timestamp: 1.0,
            temperature: 20.0,
            lat: 7.5,
            lon: 80.25,
            alt: 100.0,
            accel: [0.0, 0.0, 1.0],
            gyro: [0.1, 0.2, 0.3],
            mag: [30.0, 40.0, 50.0],
            rssi: Some(-60.0),
            snr: None,
            speed: Some(12.5),
        };

        assert_eq!(
            SchemaVersion::Basic.format_row(&record),
            "1,20,7.5,80.25,100,0,0,1,0.1,0.2,0.3,30,40,50\n"
        );
        assert_eq!(
            SchemaVersion::Extended.format_row(&record),
            "1,20,7.5,80.25,100,0,0,1,0.1,0.2,0.3,30,40,50,-60,0,12.5\n"
        );
    }

    #[test]
    fn test_row_matches_column_count() {
        for schema in [SchemaVersion::Basic, SchemaVersion::Extended] {
            let row = schema.format_row(&TelemetryRecord::default());
            assert_eq!(row.trim_end().split(',').count(), schema.columns().len());
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!("basic".parse::<SchemaVersion>(), Ok(SchemaVersion::Basic));
        assert_eq!("Extended".parse::<SchemaVersion>(), Ok(SchemaVersion::Extended));
        assert!("v3".parse::<SchemaVersion>().is_err());
    }
}
