//! Controller Configuration

use crate::topology::TopologyKind;
use serde::{Deserialize, Serialize};

/// Controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeConfig {
    /// Topology to build and route over
    pub topology: TopologyConfig,
    /// Usage percentage marking a node as overloaded
    pub usage_limit: f64,
    /// Maximum/sentinel edge weight ("avoid this link")
    pub ceiling: f64,
    /// Reproduce the legacy shared-score weight assignment bit for bit
    pub legacy_shared_weights: bool,
    /// Seconds between telemetry sweeps
    pub telemetry_interval_secs: u64,
    /// Seconds between route recomputations
    pub replan_interval_secs: u64,
    /// Timeout for a single probe or route command, in seconds
    pub command_timeout_secs: u64,
    /// Command run on each node to sample usage; prints `[mem_pct, cpu_pct]`
    pub probe_command: String,
    /// Append-only audit log of every published route
    pub audit_log: String,
    /// Optional path the latest snapshot is persisted to for external readers
    pub snapshot_file: Option<String>,
    /// Optional hosts-format file for name resolution; generated from the
    /// topology when absent
    pub hosts_file: Option<String>,
    /// Ping every routed host pair after each publish cycle
    pub connectivity_checks: bool,
}

impl Default for TeConfig {
    fn default() -> Self {
        Self {
            topology: TopologyConfig::default(),
            usage_limit: 70.0,
            ceiling: 400.0,
            legacy_shared_weights: false,
            telemetry_interval_secs: 60,
            replan_interval_secs: 60,
            command_timeout_secs: 10,
            probe_command: "python collect_usage.py".into(),
            audit_log: "srLog.txt".into(),
            snapshot_file: None,
            hosts_file: None,
            connectivity_checks: true,
        }
    }
}

impl TeConfig {
    /// Load from file
    pub fn load(path: &str) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Save to file
    pub fn save(&self, path: &str) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Timeout for probe and route commands
    pub fn command_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.command_timeout_secs)
    }
}

/// Topology shape and size
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Topology kind
    pub kind: TopologyKind,
    /// Size parameter; its meaning depends on the kind
    pub size: usize,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self { kind: TopologyKind::Linear, size: 3 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_roundtrip() {
        let config = TeConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: TeConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(back.usage_limit, 70.0);
        assert_eq!(back.ceiling, 400.0);
        assert!(!back.legacy_shared_weights);
        assert_eq!(back.topology.size, 3);
    }

    #[test]
    fn kind_serializes_as_lowercase_tag() {
        let json = serde_json::to_string(&TopologyConfig::default()).unwrap();
        assert!(json.contains("\"linear\""));
    }
}
