//! Route Publishing
//!
//! Turns a planned path and its segment list into seg6 encap/decap route
//! commands on the affected nodes, serialized per node so concurrent
//! publishes cannot race `route add` against `route flush` on a shared
//! first hop.

use crate::audit::{AuditLog, AuditRecord};
use crate::resolver::AddressResolver;
use crate::runner::CommandRunner;
use crate::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Programs encapsulation state onto forwarding nodes
pub struct RoutePublisher {
    runner: Arc<dyn CommandRunner>,
    resolver: Arc<dyn AddressResolver>,
    audit: Arc<AuditLog>,
    node_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl RoutePublisher {
    /// New publisher over the command and resolution seams
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        resolver: Arc<dyn AddressResolver>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self { runner, resolver, audit, node_locks: Mutex::new(HashMap::new()) }
    }

    /// Install the SRv6 route for `src` -> `dst` along `path`
    ///
    /// Adds the encap route on the first-hop (source) node and the decap
    /// route on the destination. On the first publish for a pair
    /// (`initial_route`), stale default-table routes on both programmed
    /// nodes are flushed first. Every call appends an audit block.
    pub async fn publish(
        &self,
        src: &str,
        dst: &str,
        path: &[String],
        sids: &[String],
        initial_route: bool,
    ) -> Result<()> {
        let next = path
            .get(1)
            .ok_or_else(|| Error::NoPath { src: src.to_string(), dst: dst.to_string() })?;
        let prev = &path[path.len() - 2];

        let dst_address = self.resolver.resolve_first(dst)?;
        let dst_prefix = prefix64(&dst_address);

        let src_dev = format!("{src}-{next}");
        let dst_dev = format!("{dst}-{prev}");

        // The final SID is the destination itself; everything before it is
        // the encapsulation segment list.
        let segments = &sids[..sids.len().saturating_sub(1)];
        let encap = (!segments.is_empty()).then(|| {
            format!(
                "ip -6 route add {dst_prefix} encap seg6 mode encap segs {} dev {src_dev}",
                segments.join(",")
            )
        });
        let decap = sids.last().map(|sid| {
            format!("ip -6 route add {sid} encap seg6local action End.DT6 table 254 dev {dst_dev}")
        });

        // Per-node command batches: optional flush first, then the route.
        let mut on_src = Vec::new();
        let mut on_dst = Vec::new();
        if initial_route {
            on_src.push(format!("ip -6 route flush table main dev {src_dev}"));
            on_dst.push(format!("ip -6 route flush table main dev {dst_dev}"));
        }
        on_src.extend(encap);
        on_dst.extend(decap);

        // Audit the generated commands before touching any node, so the
        // record exists even when execution fails partway.
        self.audit.append(&AuditRecord {
            src: src.to_string(),
            dst: dst.to_string(),
            path: path.to_vec(),
            commands: on_src.iter().chain(&on_dst).cloned().collect(),
        });

        for (node, commands) in [(src, &on_src), (dst, &on_dst)] {
            let lock = self.node_lock(node);
            let _guard = lock.lock().await;
            for command in commands {
                self.runner.run(node, command).await?;
            }
        }

        tracing::info!(src, dst, path = %path.join(" -> "), "route published");
        Ok(())
    }

    fn node_lock(&self, node: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.node_locks
            .lock()
            .entry(node.to_string())
            .or_default()
            .clone()
    }
}

/// Clear the host bits of an IPv6 address down to its /64 prefix
fn prefix64(address: &str) -> String {
    match address.rsplit_once("::") {
        Some((head, _)) => format!("{head}::/64"),
        None => format!("{address}/64"),
    }
}
