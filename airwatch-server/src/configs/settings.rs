use std::error::Error;
use std::path::PathBuf;
use std::{env, fs};

use airwatch_api::WireProtocol;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

/// The sensor node the collector dials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub protocol: WireProtocol,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub reconnect_delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub clean_start: bool,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alarm {
    /// Evaluation tick interval
    pub tick_secs: u64,
    /// A reading older than this silences alarms instead of triggering them
    pub freshness_secs: i64,
    /// Minimum interval between repeat alert emails for a still-triggered rule
    pub cooldown_secs: i64,
    /// Rule list location, rewritten whole on every mutation
    pub rules_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub logger: Logger,
    pub node: Node,
    pub database: Database,
    pub alarm: Alarm,
}

impl Settings {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        let run_mode = env::var("RUN_MODE").unwrap_or("default".into());
        let path = PathBuf::from("configs").join(format!("{run_mode}.toml"));

        let raw = fs::read_to_string(&path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;

        Ok(toml::from_str(&raw)?)
    }
}
