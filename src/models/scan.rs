use serde::{Deserialize, Serialize};

/// Lifecycle state of a scan record. Advances monotonically and never
/// reverts; `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanStatus {
    Starting,
    Spidering,
    Scanning,
    Completed,
    Failed,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Starting => "Starting",
            ScanStatus::Spidering => "Spidering",
            ScanStatus::Scanning => "Scanning",
            ScanStatus::Completed => "Completed",
            ScanStatus::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single normalized finding reported by the scan engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vulnerability {
    pub name: String,
    /// Risk level, e.g. "High". The engine reports a composite description
    /// like "High (Medium)"; only the leading token is kept.
    pub risk: String,
    pub url: String,
    pub description: String,
}

impl Vulnerability {
    /// Extracts the risk level from the engine's composite risk description.
    pub fn risk_from_riskdesc(riskdesc: &str) -> String {
        riskdesc
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string()
    }
}
