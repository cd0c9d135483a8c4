//! Name -> Address Resolution
//!
//! Collaborator seam to the emulator's hosts table. The control plane only
//! needs a lookup returning zero or more addresses with first-match-wins
//! semantics.

use crate::topology::{node_suffix, NodeRole, Topology};
use crate::{Error, Result};

/// Resolves node names to their addresses
pub trait AddressResolver: Send + Sync {
    /// All addresses recorded for `name`, in table order
    fn resolve(&self, name: &str) -> Vec<String>;

    /// First address recorded for `name`
    fn resolve_first(&self, name: &str) -> Result<String> {
        self.resolve(name)
            .into_iter()
            .next()
            .ok_or_else(|| Error::Resolution { name: name.to_string() })
    }
}

/// In-memory hosts table, `/etc/hosts` style: address plus aliases
#[derive(Debug, Clone, Default)]
pub struct HostsTable {
    entries: Vec<(String, Vec<String>)>,
}

impl HostsTable {
    /// Parse a hosts-format file (address followed by names, `#` comments)
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut entries = Vec::new();
        for line in content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            if let Some(address) = fields.next() {
                let names: Vec<String> = fields.map(str::to_string).collect();
                if !names.is_empty() {
                    entries.push((address.to_string(), names));
                }
            }
        }
        Ok(Self { entries })
    }

    /// Generate the emulator's address plan for a topology: hosts get
    /// `fd00:0:{n}::2`, routers `fcff:{n}::1`, keyed by the name suffix.
    pub fn from_topology(topo: &Topology) -> Self {
        let mut entries = Vec::new();
        for node in topo.nodes() {
            let Some(n) = node_suffix(node) else { continue };
            let address = match NodeRole::of(node) {
                NodeRole::Host => format!("fd00:0:{n}::2"),
                NodeRole::Router => format!("fcff:{n}::1"),
            };
            entries.push((address, vec![node.to_string()]));
        }
        Self { entries }
    }

    /// Add an entry
    pub fn add(&mut self, address: &str, name: &str) {
        self.entries.push((address.to_string(), vec![name.to_string()]));
    }
}

impl AddressResolver for HostsTable {
    fn resolve(&self, name: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, names)| names.iter().any(|n| n == name))
            .map(|(address, _)| address.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::TopologyKind;

    #[test]
    fn topology_address_plan() {
        let topo = Topology::build(TopologyKind::Linear, 2);
        let table = HostsTable::from_topology(&topo);

        assert_eq!(table.resolve_first("h1").unwrap(), "fd00:0:1::2");
        assert_eq!(table.resolve_first("r2").unwrap(), "fcff:2::1");
    }

    #[test]
    fn first_match_wins() {
        let mut table = HostsTable::default();
        table.add("fd00:0:9::2", "h9");
        table.add("fd00:0:9::3", "h9");

        assert_eq!(table.resolve("h9").len(), 2);
        assert_eq!(table.resolve_first("h9").unwrap(), "fd00:0:9::2");
    }

    #[test]
    fn missing_name_is_resolution_error() {
        let table = HostsTable::default();
        assert!(matches!(
            table.resolve_first("h404"),
            Err(Error::Resolution { name }) if name == "h404"
        ));
    }

    #[test]
    fn hosts_file_parsing() {
        let path = std::env::temp_dir().join("srv6te-hosts-test");
        std::fs::write(
            &path,
            "# local names\n::1 ip6-localhost ip6-loopback\nfd00:0:1::2 h1 # branch host\n\n",
        )
        .unwrap();

        let table = HostsTable::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(table.resolve_first("h1").unwrap(), "fd00:0:1::2");
        assert_eq!(table.resolve_first("ip6-loopback").unwrap(), "::1");

        std::fs::remove_file(&path).ok();
    }
}
