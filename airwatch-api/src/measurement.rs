use serde::{Deserialize, Serialize};

/// One decoded sample from the sensor node.
///
/// Field layout mirrors the wire payload. The node does not send a clock;
/// the host stamps a timestamp when it persists a sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Temperature in Celsius, one decimal on the wire
    pub temperature: f32,
    /// Relative humidity %, one decimal on the wire
    pub humidity: f32,
    /// PM2.5 concentration in µg/m³
    pub pm25: u16,
    /// Noise level in dB
    pub noise: u8,
}

impl Measurement {
    /// Selects one field at native precision.
    pub fn value(&self, kind: SensorKind) -> f64 {
        match kind {
            SensorKind::Temperature => self.temperature as f64,
            SensorKind::Humidity => self.humidity as f64,
            SensorKind::Pm25 => self.pm25 as f64,
            SensorKind::Noise => self.noise as f64,
        }
    }
}

/// The four quantities the node reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Temperature,
    Humidity,
    Pm25,
    Noise,
}

impl SensorKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::Pm25 => "pm25",
            Self::Noise => "noise",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Self::Temperature => "°C",
            Self::Humidity => "%",
            Self::Pm25 => "µg/m³",
            Self::Noise => "dB",
        }
    }
}
