//! Telemetry Collection
//!
//! Samples per-node memory/cpu usage through the command-execution seam on
//! a fixed cadence and publishes wholesale snapshots. No history is kept;
//! each sweep overwrites the previous values.

use crate::runner::CommandRunner;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Backoff before the single retry of a failed probe
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Latest usage sample for one node, in percent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeUsage {
    /// Memory usage percentage
    pub memory_usage: f64,
    /// CPU usage percentage
    pub cpu_usage: f64,
}

/// Wholesale usage snapshot, keyed by node name
///
/// Serializes to the inter-process handoff format:
/// `{"h1": {"memory_usage": 10.0, "cpu_usage": 10.0}, ...}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TelemetrySnapshot {
    nodes: BTreeMap<String, NodeUsage>,
}

impl TelemetrySnapshot {
    /// Usage for one node, if it has ever been sampled
    pub fn get(&self, node: &str) -> Option<NodeUsage> {
        self.nodes.get(node).copied()
    }

    /// Record a node's usage, replacing any prior value
    pub fn insert(&mut self, node: &str, usage: NodeUsage) {
        self.nodes.insert(node.to_string(), usage);
    }

    /// Whether any node has been sampled yet
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over sampled nodes
    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeUsage)> {
        self.nodes.iter().map(|(n, u)| (n.as_str(), *u))
    }

    /// Persist wholesale for external readers
    pub fn save(&self, path: &str) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load a previously persisted snapshot
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Samples usage on every node through the command runner
pub struct TelemetryCollector {
    runner: Arc<dyn CommandRunner>,
    probe_command: String,
    latest: TelemetrySnapshot,
}

impl TelemetryCollector {
    /// New collector issuing `probe_command` on each node
    pub fn new(runner: Arc<dyn CommandRunner>, probe_command: &str) -> Self {
        Self {
            runner,
            probe_command: probe_command.to_string(),
            latest: TelemetrySnapshot::default(),
        }
    }

    /// Probe a single node and parse its `[mem_pct, cpu_pct]` output
    pub async fn sample(&self, node: &str) -> Result<NodeUsage> {
        let output = self.runner.run(node, &self.probe_command).await.map_err(|e| {
            Error::Collection { node: node.to_string(), reason: e.to_string() }
        })?;

        let values: [f64; 2] =
            serde_json::from_str(output.trim()).map_err(|e| Error::Collection {
                node: node.to_string(),
                reason: format!("unparseable probe output {:?}: {e}", output.trim()),
            })?;

        Ok(NodeUsage { memory_usage: values[0], cpu_usage: values[1] })
    }

    /// Sweep every node and return the refreshed snapshot
    ///
    /// A node whose probe fails (after one retry) keeps its previous value
    /// and is logged; the rest of the snapshot proceeds. The returned
    /// snapshot is a wholesale copy, safe to hand to readers.
    pub async fn collect_all(&mut self, nodes: &[String]) -> TelemetrySnapshot {
        for node in nodes {
            match self.sample_with_retry(node).await {
                Ok(usage) => self.latest.insert(node, usage),
                Err(e) => {
                    tracing::warn!(%node, error = %e, "probe failed, keeping previous sample");
                }
            }
        }
        self.latest.clone()
    }

    async fn sample_with_retry(&self, node: &str) -> Result<NodeUsage> {
        match self.sample(node).await {
            Ok(usage) => Ok(usage),
            Err(e) => {
                tracing::debug!(node, error = %e, "probe failed, retrying");
                tokio::time::sleep(RETRY_BACKOFF).await;
                self.sample(node).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::mock::MockRunner;

    #[tokio::test]
    async fn sample_parses_probe_output() {
        let runner = Arc::new(MockRunner::new());
        runner.script("h1", "[12.5, 3.0]\n");

        let collector = TelemetryCollector::new(runner, "probe");
        let usage = collector.sample("h1").await.unwrap();

        assert_eq!(usage.memory_usage, 12.5);
        assert_eq!(usage.cpu_usage, 3.0);
    }

    #[tokio::test]
    async fn garbage_output_is_collection_error() {
        let runner = Arc::new(MockRunner::new());
        runner.script("h1", "out of memory");

        let collector = TelemetryCollector::new(runner, "probe");
        let err = collector.sample("h1").await.unwrap_err();

        assert!(matches!(err, Error::Collection { node, .. } if node == "h1"));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_probe_keeps_previous_value() {
        let runner = Arc::new(MockRunner::new());
        runner.script("h1", "[10.0, 20.0]");
        // Second sweep: both the attempt and the retry fail.
        runner.fail("h1", "probe died");
        runner.fail("h1", "probe died");

        let nodes = vec!["h1".to_string()];
        let mut collector = TelemetryCollector::new(runner, "probe");

        let first = collector.collect_all(&nodes).await;
        assert_eq!(first.get("h1").unwrap().memory_usage, 10.0);

        let second = collector.collect_all(&nodes).await;
        assert_eq!(second.get("h1").unwrap().memory_usage, 10.0);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_recovers_from_transient_failure() {
        let runner = Arc::new(MockRunner::new());
        runner.fail("h1", "transient");
        runner.script("h1", "[5.0, 6.0]");

        let nodes = vec!["h1".to_string()];
        let mut collector = TelemetryCollector::new(runner.clone(), "probe");

        let snapshot = collector.collect_all(&nodes).await;
        assert_eq!(snapshot.get("h1").unwrap().cpu_usage, 6.0);
        assert_eq!(runner.commands_on("h1").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn never_sampled_node_is_absent() {
        let runner = Arc::new(MockRunner::new());
        runner.fail("h1", "down");
        runner.fail("h1", "down");
        runner.script("h2", "[1.0, 2.0]");

        let nodes = vec!["h1".to_string(), "h2".to_string()];
        let mut collector = TelemetryCollector::new(runner, "probe");

        let snapshot = collector.collect_all(&nodes).await;
        assert!(snapshot.get("h1").is_none());
        assert!(snapshot.get("h2").is_some());
    }

    #[test]
    fn snapshot_persist_roundtrip() {
        let mut snapshot = TelemetrySnapshot::default();
        snapshot.insert("r1", NodeUsage { memory_usage: 33.0, cpu_usage: 44.0 });

        let path = std::env::temp_dir().join("srv6te-snapshot-test.json");
        let path = path.to_str().unwrap();
        snapshot.save(path).unwrap();
        let back = TelemetrySnapshot::load(path).unwrap();
        std::fs::remove_file(path).ok();

        assert_eq!(back, snapshot);
    }

    #[test]
    fn snapshot_wire_format() {
        let mut snapshot = TelemetrySnapshot::default();
        snapshot.insert("h1", NodeUsage { memory_usage: 10.0, cpu_usage: 20.0 });

        let json = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(json, r#"{"h1":{"memory_usage":10.0,"cpu_usage":20.0}}"#);

        let back: TelemetrySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
