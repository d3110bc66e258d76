use airwatch_api::{Measurement, SensorKind};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::Table;

/// One persisted sensor reading.
///
/// Created only by a successful frame decode or by read-back from storage,
/// never mutated afterwards.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reading {
    pub id: i32,
    /// Temperature in Celsius
    pub temperature: f32,
    /// Relative humidity %
    pub humidity: f32,
    /// PM2.5 in µg/m³
    pub pm25: i32,
    /// Noise in dB
    pub noise: i32,
    /// When the frame was decoded; the node itself sends no clock
    pub time: OffsetDateTime,
}

impl Reading {
    /// Stamps a decoded wire measurement with the host clock.
    pub fn from_measurement(measurement: &Measurement, time: OffsetDateTime) -> Self {
        Self {
            id: 0,
            temperature: measurement.temperature,
            humidity: measurement.humidity,
            pm25: measurement.pm25 as i32,
            noise: measurement.noise as i32,
            time,
        }
    }

    /// Selects one quantity at native precision.
    pub fn value(&self, kind: SensorKind) -> f64 {
        match kind {
            SensorKind::Temperature => self.temperature as f64,
            SensorKind::Humidity => self.humidity as f64,
            SensorKind::Pm25 => self.pm25 as f64,
            SensorKind::Noise => self.noise as f64,
        }
    }
}

#[derive(Clone)]
pub struct ReadingTable;

impl Table for ReadingTable {
    fn name(&self) -> &'static str {
        "readings"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS readings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                temperature REAL NOT NULL,
                humidity REAL NOT NULL,
                pm25 INTEGER NOT NULL,
                noise INTEGER NOT NULL,
                time TIMESTAMP NOT NULL
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS readings;")
    }
}
