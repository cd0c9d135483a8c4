//! Topology Model
//!
//! Holds the node/edge graph the control plane routes over, including the
//! mutable per-edge weights the weight engine recomputes each cycle.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Role of a node, derived from its name prefix (`r*` router, `h*` host)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// End host; source or destination of routed traffic
    Host,
    /// Forwarding node
    Router,
}

impl NodeRole {
    /// Role implied by a node name
    pub fn of(name: &str) -> Self {
        if name.starts_with('r') {
            Self::Router
        } else {
            Self::Host
        }
    }
}

/// Numeric suffix of a node name (`r12` -> `12`)
pub fn node_suffix(name: &str) -> Option<u32> {
    name.get(1..)?.parse().ok()
}

/// Supported topology shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopologyKind {
    /// Chain of routers, one host hanging off each
    Linear,
    /// Single hub router with host leaves
    Star,
    /// Balanced tree, branching factor and height both `size`
    Tree,
    /// `size` x `size` host grid with 4-neighbor connectivity
    Mesh,
}

/// The node/edge graph with per-edge weights
///
/// Undirected: every edge is stored in both adjacency directions and
/// `set_weight` keeps the two in sync. Neighbor iteration is in sorted
/// name order.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    roles: BTreeMap<String, NodeRole>,
    adjacency: BTreeMap<String, BTreeMap<String, f64>>,
}

impl Topology {
    /// Empty topology
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a topology of the given kind and size
    pub fn build(kind: TopologyKind, size: usize) -> Self {
        match kind {
            TopologyKind::Linear => Self::linear(size),
            TopologyKind::Star => Self::star(size),
            TopologyKind::Tree => Self::tree(size),
            TopologyKind::Mesh => Self::mesh(size),
        }
    }

    /// Add a node; its role follows from the name prefix
    pub fn add_node(&mut self, name: &str) {
        self.roles.insert(name.to_string(), NodeRole::of(name));
        self.adjacency.entry(name.to_string()).or_default();
    }

    /// Add an undirected edge with the default weight
    ///
    /// Both endpoints must already exist.
    pub fn add_edge(&mut self, a: &str, b: &str) {
        debug_assert!(self.roles.contains_key(a) && self.roles.contains_key(b));
        self.adjacency
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string(), 1.0);
        self.adjacency
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string(), 1.0);
    }

    /// Whether the node exists
    pub fn contains(&self, name: &str) -> bool {
        self.roles.contains_key(name)
    }

    /// Role of a node
    pub fn role(&self, name: &str) -> Option<NodeRole> {
        self.roles.get(name).copied()
    }

    /// All node names, sorted
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }

    /// All host names, sorted
    pub fn hosts(&self) -> Vec<String> {
        self.roles
            .iter()
            .filter(|(_, role)| **role == NodeRole::Host)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Neighbors of a node with current edge weights, sorted by name
    pub fn neighbors<'a>(&'a self, name: &str) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        self.adjacency
            .get(name)
            .into_iter()
            .flat_map(|edges| edges.iter().map(|(n, w)| (n.as_str(), *w)))
    }

    /// Neighbor names of a node, sorted
    pub fn neighbor_names(&self, name: &str) -> Vec<String> {
        self.neighbors(name).map(|(n, _)| n.to_string()).collect()
    }

    /// Current weight of an edge
    pub fn weight(&self, a: &str, b: &str) -> Option<f64> {
        self.adjacency.get(a)?.get(b).copied()
    }

    /// Set the weight of an existing edge, in both directions
    pub fn set_weight(&mut self, a: &str, b: &str, weight: f64) {
        if let Some(edges) = self.adjacency.get_mut(a) {
            if let Some(w) = edges.get_mut(b) {
                *w = weight;
            }
        }
        if let Some(edges) = self.adjacency.get_mut(b) {
            if let Some(w) = edges.get_mut(a) {
                *w = weight;
            }
        }
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.roles.len()
    }

    /// Number of undirected edges
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeMap::len).sum::<usize>() / 2
    }

    fn linear(size: usize) -> Self {
        let mut topo = Self::new();
        for i in 1..=size {
            topo.add_node(&format!("r{i}"));
            topo.add_node(&format!("h{i}"));
            topo.add_edge(&format!("r{i}"), &format!("h{i}"));
        }
        for i in 1..size {
            topo.add_edge(&format!("r{i}"), &format!("r{}", i + 1));
        }
        topo
    }

    fn star(size: usize) -> Self {
        let edges: Vec<(usize, usize)> = (1..=size).map(|leaf| (0, leaf)).collect();
        Self::from_numbered_edges(&edges)
    }

    fn tree(size: usize) -> Self {
        // Complete tree with branching factor and height both `size`,
        // nodes indexed breadth-first.
        let mut count = 1usize;
        let mut layer = 1usize;
        for _ in 0..size {
            layer *= size;
            count += layer;
        }
        let mut edges = Vec::new();
        for parent in 0..count {
            for c in 0..size {
                let child = size * parent + c + 1;
                if child < count {
                    edges.push((parent, child));
                }
            }
        }
        Self::from_numbered_edges(&edges)
    }

    fn mesh(size: usize) -> Self {
        let mut topo = Self::new();
        for i in 0..size {
            for j in 0..size {
                topo.add_node(&format!("h{i}{j}"));
            }
        }
        for i in 0..size {
            for j in 0..size {
                if i + 1 < size {
                    topo.add_edge(&format!("h{i}{j}"), &format!("h{}{j}", i + 1));
                }
                if j + 1 < size {
                    topo.add_edge(&format!("h{i}{j}"), &format!("h{i}{}", j + 1));
                }
            }
        }
        topo
    }

    /// Name numbered nodes by degree: interior nodes (degree > 1) become
    /// routers, leaves become hosts, both numbered from 1.
    fn from_numbered_edges(edges: &[(usize, usize)]) -> Self {
        let mut degree: BTreeMap<usize, usize> = BTreeMap::new();
        for (a, b) in edges {
            *degree.entry(*a).or_default() += 1;
            *degree.entry(*b).or_default() += 1;
        }
        let name = |id: usize| {
            if degree.get(&id).copied().unwrap_or(0) > 1 {
                format!("r{}", id + 1)
            } else {
                format!("h{}", id + 1)
            }
        };
        let mut topo = Self::new();
        for id in degree.keys() {
            topo.add_node(&name(*id));
        }
        for (a, b) in edges {
            topo.add_edge(&name(*a), &name(*b));
        }
        topo
    }
}
