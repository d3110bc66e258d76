use std::error::Error;

use airwatch_api::WireProtocol;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

/// The listen side of the link the host dials. Shares the `[node]` section
/// with the server config so both ends agree on address and framing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub protocol: WireProtocol,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mock {
    pub send_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub logger: Logger,
    pub node: Node,
    pub mock: Mock,
}

impl Settings {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        let settings: Settings = toml::from_str(include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../",
            "configs/default.toml"
        )))?;

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_parses() {
        let settings = Settings::new().unwrap();
        assert!(settings.mock.send_interval_secs > 0);
        assert!(!settings.node.host.is_empty());
    }
}
