//! Path Planning
//!
//! Weighted shortest-path search over the topology and derivation of the
//! SRv6 segment list for a chosen path.

use crate::resolver::AddressResolver;
use crate::topology::{node_suffix, NodeRole, Topology};
use crate::{Error, Result};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

/// Pending visit in the Dijkstra frontier; min-heap by cost, node name as
/// the deterministic tiebreak
#[derive(Debug, Clone, PartialEq)]
struct Visit {
    cost: f64,
    node: String,
}

impl Eq for Visit {}

impl Ord for Visit {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Visit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Weighted shortest path from `src` to `dst` over current edge weights
///
/// Returns the node sequence including both endpoints. Disconnected pairs
/// are a [`Error::NoPath`], reported rather than crashing the caller's
/// control loop.
pub fn shortest_path(topo: &Topology, src: &str, dst: &str) -> Result<Vec<String>> {
    let no_path = || Error::NoPath { src: src.to_string(), dst: dst.to_string() };
    if !topo.contains(src) || !topo.contains(dst) {
        return Err(no_path());
    }
    if src == dst {
        return Ok(vec![src.to_string()]);
    }

    let mut dist: BTreeMap<String, f64> = BTreeMap::new();
    let mut prev: BTreeMap<String, String> = BTreeMap::new();
    let mut heap = BinaryHeap::new();

    dist.insert(src.to_string(), 0.0);
    heap.push(Visit { cost: 0.0, node: src.to_string() });

    while let Some(Visit { cost, node }) = heap.pop() {
        if node == dst {
            let mut path = vec![dst.to_string()];
            let mut cursor = dst;
            while let Some(parent) = prev.get(cursor) {
                path.push(parent.clone());
                cursor = parent;
            }
            path.reverse();
            return Ok(path);
        }
        if dist.get(&node).is_some_and(|d| cost > *d) {
            continue; // stale frontier entry
        }
        for (neighbor, weight) in topo.neighbors(&node) {
            let next_cost = cost + weight;
            if dist.get(neighbor).is_none_or(|d| next_cost < *d) {
                dist.insert(neighbor.to_string(), next_cost);
                prev.insert(neighbor.to_string(), node.clone());
                heap.push(Visit { cost: next_cost, node: neighbor.to_string() });
            }
        }
    }

    Err(no_path())
}

/// Derive the ordered SRv6 segment list for a path
///
/// Router-to-router hops use the canonical `lo:hi` SID with a direction
/// tag (`::2` forward, `::1` reverse); hops touching a host use the
/// neighbor's resolved address. The final element is the destination
/// itself; callers exclude it when building the encapsulation list.
pub fn derive_sids(
    path: &[String],
    resolver: &dyn AddressResolver,
) -> Result<Vec<String>> {
    let mut sids = Vec::with_capacity(path.len().saturating_sub(1));
    for pair in path.windows(2) {
        let (cur, next) = (&pair[0], &pair[1]);
        if NodeRole::of(cur) == NodeRole::Router && NodeRole::of(next) == NodeRole::Router {
            let a = node_suffix(cur)
                .ok_or_else(|| Error::Resolution { name: cur.clone() })?;
            let b = node_suffix(next)
                .ok_or_else(|| Error::Resolution { name: next.clone() })?;
            if b > a {
                sids.push(format!("fcf0:0:{a}:{b}::2"));
            } else {
                sids.push(format!("fcf0:0:{b}:{a}::1"));
            }
        } else {
            sids.push(resolver.resolve_first(next)?);
        }
    }
    Ok(sids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::HostsTable;
    use crate::topology::TopologyKind;

    fn diamond() -> Topology {
        // h1 - r1 - {r2 | r3} - r4 - h2, with the r3 leg cheaper.
        let mut topo = Topology::new();
        for n in ["h1", "h2", "r1", "r2", "r3", "r4"] {
            topo.add_node(n);
        }
        for (a, b) in [("h1", "r1"), ("r1", "r2"), ("r1", "r3"), ("r2", "r4"), ("r3", "r4"), ("r4", "h2")] {
            topo.add_edge(a, b);
        }
        topo.set_weight("r1", "r2", 100.0);
        topo.set_weight("r2", "r4", 100.0);
        topo.set_weight("r1", "r3", 10.0);
        topo.set_weight("r3", "r4", 10.0);
        topo
    }

    #[test]
    fn picks_minimum_weight_path() {
        let topo = diamond();
        let path = shortest_path(&topo, "h1", "h2").unwrap();
        assert_eq!(path, vec!["h1", "r1", "r3", "r4", "h2"]);
    }

    #[test]
    fn reroutes_when_weights_flip() {
        let mut topo = diamond();
        topo.set_weight("r1", "r3", 400.0);

        let path = shortest_path(&topo, "h1", "h2").unwrap();
        assert_eq!(path, vec!["h1", "r1", "r2", "r4", "h2"]);
    }

    #[test]
    fn disconnected_pair_is_no_path() {
        let mut topo = Topology::build(TopologyKind::Linear, 2);
        topo.add_node("h9"); // isolated

        let err = shortest_path(&topo, "h1", "h9").unwrap_err();
        assert!(matches!(err, Error::NoPath { src, dst } if src == "h1" && dst == "h9"));
    }

    #[test]
    fn trivial_path_is_the_node_itself() {
        let topo = Topology::build(TopologyKind::Linear, 2);
        assert_eq!(shortest_path(&topo, "h1", "h1").unwrap(), vec!["h1"]);
    }

    #[test]
    fn router_chain_sids() {
        let path = vec!["r1".to_string(), "r2".to_string(), "r3".to_string()];
        let sids = derive_sids(&path, &HostsTable::default()).unwrap();
        assert_eq!(sids, vec!["fcf0:0:1:2::2", "fcf0:0:2:3::2"]);
    }

    #[test]
    fn reverse_traversal_flips_direction_tag() {
        let path = vec!["r3".to_string(), "r2".to_string(), "r1".to_string()];
        let sids = derive_sids(&path, &HostsTable::default()).unwrap();
        assert_eq!(sids, vec!["fcf0:0:2:3::1", "fcf0:0:1:2::1"]);
    }

    #[test]
    fn host_hops_use_resolved_addresses() {
        let topo = Topology::build(TopologyKind::Linear, 2);
        let table = HostsTable::from_topology(&topo);

        let path: Vec<String> =
            ["h1", "r1", "r2", "h2"].iter().map(|s| s.to_string()).collect();
        let sids = derive_sids(&path, &table).unwrap();

        // h1->r1 touches a host, r1->r2 is router-router, r2->h2 resolves h2.
        assert_eq!(sids, vec!["fcff:1::1", "fcf0:0:1:2::2", "fd00:0:2::2"]);
    }

    #[test]
    fn unresolvable_hop_is_resolution_error() {
        let path = vec!["h1".to_string(), "r1".to_string()];
        let err = derive_sids(&path, &HostsTable::default()).unwrap_err();
        assert!(matches!(err, Error::Resolution { name } if name == "r1"));
    }
}
