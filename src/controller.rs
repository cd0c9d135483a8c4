//! Control Loops
//!
//! Two long-running loops execute concurrently: the telemetry loop sweeps
//! node usage on a fixed cadence and publishes wholesale snapshots over a
//! watch channel; the routing loop consumes the latest snapshot,
//! recomputes edge weights, re-plans every host pair, and re-publishes
//! routes. No core error terminates either loop; a stop signal is checked
//! at each cycle boundary.

use crate::audit::AuditLog;
use crate::config::TeConfig;
use crate::planner;
use crate::publisher::RoutePublisher;
use crate::resolver::{AddressResolver, HostsTable};
use crate::runner::{CommandRunner, NetnsRunner};
use crate::telemetry::{TelemetryCollector, TelemetrySnapshot};
use crate::topology::Topology;
use crate::weights::WeightEngine;
use crate::Result;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// The traffic-engineering control plane
pub struct TeController {
    config: TeConfig,
    topology: Arc<RwLock<Topology>>,
    runner: Arc<dyn CommandRunner>,
    resolver: Arc<dyn AddressResolver>,
    publisher: Arc<RoutePublisher>,
    shutdown: watch::Sender<bool>,
}

impl TeController {
    /// New controller over explicit collaborator implementations
    pub fn new(
        config: TeConfig,
        runner: Arc<dyn CommandRunner>,
        resolver: Arc<dyn AddressResolver>,
        audit: Arc<AuditLog>,
    ) -> Self {
        let topology = Topology::build(config.topology.kind, config.topology.size);
        let publisher =
            Arc::new(RoutePublisher::new(runner.clone(), resolver.clone(), audit));
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            topology: Arc::new(RwLock::new(topology)),
            runner,
            resolver,
            publisher,
            shutdown,
        }
    }

    /// New controller with the production collaborators: netns command
    /// execution, hosts-table resolution, file-backed audit log
    pub fn with_defaults(config: TeConfig) -> Result<Self> {
        let runner = Arc::new(NetnsRunner::new(config.command_timeout()));
        let resolver: Arc<dyn AddressResolver> = match &config.hosts_file {
            Some(path) => Arc::new(HostsTable::from_file(path)?),
            None => Arc::new(HostsTable::from_topology(&Topology::build(
                config.topology.kind,
                config.topology.size,
            ))),
        };
        let audit = Arc::new(AuditLog::open(&config.audit_log)?);
        Ok(Self::new(config, runner, resolver, audit))
    }

    /// Run both control loops until shutdown
    pub async fn run(&self) -> Result<()> {
        let (snapshot_tx, snapshot_rx) = watch::channel(TelemetrySnapshot::default());

        let collector =
            TelemetryCollector::new(self.runner.clone(), &self.config.probe_command);
        let nodes: Vec<String> =
            self.topology.read().nodes().map(str::to_string).collect();

        tracing::info!(
            nodes = nodes.len(),
            kind = ?self.config.topology.kind,
            size = self.config.topology.size,
            "starting control plane"
        );

        let telemetry = tokio::spawn(telemetry_loop(
            collector,
            nodes,
            Duration::from_secs(self.config.telemetry_interval_secs),
            self.config.snapshot_file.clone(),
            snapshot_tx,
            self.shutdown.subscribe(),
        ));

        let result = self.routing_loop(snapshot_rx, self.shutdown.subscribe()).await;
        let _ = self.shutdown.send(true);
        let _ = telemetry.await;
        result
    }

    /// Signal both loops to stop at their next cycle boundary
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Shared view of the topology and its current weights
    pub fn topology(&self) -> Arc<RwLock<Topology>> {
        self.topology.clone()
    }

    async fn routing_loop(
        &self,
        mut snapshots: watch::Receiver<TelemetrySnapshot>,
        mut stop: watch::Receiver<bool>,
    ) -> Result<()> {
        // Warm-up: block on the channel until the collector has produced a
        // first snapshot. This replaces the legacy poll-for-file wait.
        while snapshots.borrow().is_empty() {
            tokio::select! {
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                }
                res = stop.changed() => {
                    if res.is_err() || *stop.borrow() {
                        return Ok(());
                    }
                }
            }
        }

        let engine = WeightEngine::new(self.config.usage_limit, self.config.ceiling)
            .with_legacy_shared_weights(self.config.legacy_shared_weights);
        let mut ticker =
            tokio::time::interval(Duration::from_secs(self.config.replan_interval_secs));
        let mut initial_route = true;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                res = stop.changed() => {
                    if res.is_err() || *stop.borrow() {
                        return Ok(());
                    }
                    continue;
                }
            }

            let snapshot = snapshots.borrow_and_update().clone();

            // Recompute weights in place, then plan over a read copy so no
            // lock is held across command execution.
            let working = {
                let mut topo = self.topology.write();
                engine.recompute(&mut topo, &snapshot);
                topo.clone()
            };

            let hosts = working.hosts();
            for src in &hosts {
                for dst in &hosts {
                    if src == dst {
                        continue;
                    }
                    if let Err(e) =
                        self.route_pair(&working, src, dst, initial_route).await
                    {
                        tracing::warn!(%src, %dst, error = %e, "pair not routed, continuing");
                    }
                }
            }

            if self.config.connectivity_checks {
                self.check_connectivity(&hosts).await;
            }
            initial_route = false;
        }
    }

    async fn route_pair(
        &self,
        topo: &Topology,
        src: &str,
        dst: &str,
        initial_route: bool,
    ) -> Result<()> {
        let path = planner::shortest_path(topo, src, dst)?;
        let sids = planner::derive_sids(&path, self.resolver.as_ref())?;
        self.publisher.publish(src, dst, &path, &sids, initial_route).await
    }

    /// Ping every routed host pair once; observational only
    async fn check_connectivity(&self, hosts: &[String]) {
        for src in hosts {
            for dst in hosts {
                if src == dst {
                    continue;
                }
                let address = match self.resolver.resolve_first(dst) {
                    Ok(address) => address,
                    Err(e) => {
                        tracing::warn!(%dst, error = %e, "skipping connectivity check");
                        continue;
                    }
                };
                match self.runner.run(src, &format!("ping6 -c 1 -w 5 {address}")).await {
                    Ok(_) => tracing::info!(%src, %dst, "reachable"),
                    Err(e) => tracing::warn!(%src, %dst, error = %e, "unreachable"),
                }
            }
        }
    }
}

/// Sweep usage on every node each interval and publish the snapshot
async fn telemetry_loop(
    mut collector: TelemetryCollector,
    nodes: Vec<String>,
    interval: Duration,
    snapshot_file: Option<String>,
    tx: watch::Sender<TelemetrySnapshot>,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            res = stop.changed() => {
                if res.is_err() || *stop.borrow() {
                    return;
                }
                continue;
            }
        }

        let snapshot = collector.collect_all(&nodes).await;
        tracing::debug!("telemetry sweep complete");

        if let Some(path) = &snapshot_file {
            if let Err(e) = snapshot.save(path) {
                tracing::warn!(%path, error = %e, "failed to persist snapshot");
            }
        }

        // Wholesale replacement; readers never see a partial snapshot.
        if tx.send(snapshot).is_err() {
            return;
        }
    }
}
