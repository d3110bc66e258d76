use serde::{Deserialize, Serialize};

/// The two framings the sensor link speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireProtocol {
    /// Fixed 12-byte binary frame (default)
    Fixed,
    /// Length-prefixed UTF-8 JSON frame
    Json,
}

impl Default for WireProtocol {
    fn default() -> Self {
        Self::Fixed
    }
}

impl WireProtocol {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Json => "json",
        }
    }
}
