//! Congestion-Aware Weight Engine
//!
//! Recomputes every edge weight from the latest telemetry snapshot. A
//! node's incident edges are charged with the neighbor's own receive and
//! transmit load; there is no link-level measurement, only node usage, so
//! the rx and tx sub-scores share the same two underlying values.

use crate::telemetry::TelemetrySnapshot;
use crate::topology::Topology;

/// Per-neighbor congestion assessment
#[derive(Debug, Clone, Copy)]
struct NeighborScore {
    /// `ceiling - (rx_mem + rx_cpu + tx_mem + tx_cpu)`
    edge_score: f64,
    /// Neither memory nor cpu crossed the usage limit
    feasible: bool,
    /// Accumulated overload excess, the least-bad tiebreaker
    death_score: f64,
}

/// Recomputes edge weights from a telemetry snapshot
#[derive(Debug, Clone)]
pub struct WeightEngine {
    usage_limit: f64,
    ceiling: f64,
    legacy_shared: bool,
}

impl WeightEngine {
    /// New engine with the given overload threshold and weight ceiling
    pub fn new(usage_limit: f64, ceiling: f64) -> Self {
        Self { usage_limit, ceiling, legacy_shared: false }
    }

    /// Reproduce the legacy behavior of applying the last iterated
    /// neighbor's score to every incident edge, for parity with prior runs
    pub fn with_legacy_shared_weights(mut self, on: bool) -> Self {
        self.legacy_shared = on;
        self
    }

    /// Recompute every edge weight in place
    ///
    /// Each node assigns weights to its incident edges from its neighbors'
    /// usage; since edges are undirected, the node visited later (sorted
    /// name order) owns the final value of a shared edge.
    pub fn recompute(&self, topo: &mut Topology, snapshot: &TelemetrySnapshot) {
        let nodes: Vec<String> = topo.nodes().map(str::to_string).collect();
        for node in &nodes {
            let neighbors = topo.neighbor_names(node);
            if neighbors.is_empty() {
                continue;
            }

            let scores: Vec<NeighborScore> = neighbors
                .iter()
                .map(|n| {
                    let usage = snapshot.get(n).unwrap_or_default();
                    self.assess(usage.memory_usage, usage.cpu_usage)
                })
                .collect();
            let any_feasible = scores.iter().any(|s| s.feasible);

            // Legacy parity: one shared value, the last neighbor's score.
            let shared = scores.last().map(|s| s.edge_score).unwrap_or(self.ceiling);
            let pick = |score: &NeighborScore| {
                if self.legacy_shared {
                    shared
                } else {
                    score.edge_score
                }
            };

            if any_feasible {
                for (neighbor, score) in neighbors.iter().zip(&scores) {
                    let weight = (pick(score) + 1.0).clamp(0.0, self.ceiling);
                    topo.set_weight(node, neighbor, weight);
                }
            } else {
                // Everything is overloaded: mark every edge "avoid" except
                // the least-bad neighbor, the one with the smallest
                // accumulated overload.
                let least_bad = neighbors
                    .iter()
                    .zip(&scores)
                    .min_by(|(_, a), (_, b)| a.death_score.total_cmp(&b.death_score))
                    .map(|(n, _)| n.clone());
                for (neighbor, score) in neighbors.iter().zip(&scores) {
                    let weight = if Some(neighbor) == least_bad.as_ref() {
                        pick(score).clamp(0.0, self.ceiling)
                    } else {
                        self.ceiling
                    };
                    topo.set_weight(node, neighbor, weight);
                }
            }
        }
    }

    /// Score one neighbor from its own usage. Overloaded resources zero
    /// their sub-scores and feed the excess into the death score, once for
    /// the receive side and once for the transmit side.
    fn assess(&self, memory_usage: f64, cpu_usage: f64) -> NeighborScore {
        let mut death_score = 0.0;

        let mut rx_mem = memory_usage % self.usage_limit;
        let mut rx_cpu = cpu_usage % self.usage_limit;
        let mut tx_mem = rx_mem;
        let mut tx_cpu = rx_cpu;

        let mem_overloaded = memory_usage / self.usage_limit >= 1.0;
        let cpu_overloaded = cpu_usage / self.usage_limit >= 1.0;

        if mem_overloaded {
            death_score += 2.0 * (memory_usage % self.usage_limit);
            rx_mem = 0.0;
            tx_mem = 0.0;
        }
        if cpu_overloaded {
            death_score += 2.0 * (cpu_usage % self.usage_limit);
            rx_cpu = 0.0;
            tx_cpu = 0.0;
        }

        NeighborScore {
            edge_score: self.ceiling - (rx_mem + rx_cpu + tx_mem + tx_cpu),
            feasible: !mem_overloaded && !cpu_overloaded,
            death_score,
        }
    }
}
