//! SRv6 Traffic Engineering - Congestion-Aware Control Plane
//!
//! Steers traffic in an emulated segment-routed (SRv6) network around
//! congested nodes, driven by periodically sampled resource telemetry.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      SRV6-TE CONTROL PLANE                       │
//! │                                                                  │
//! │  ┌─────────────────┐   watch channel   ┌──────────────────────┐  │
//! │  │ TELEMETRY LOOP  │ ────────────────► │     ROUTING LOOP     │  │
//! │  │  usage probes   │    (snapshots)    │ weights -> dijkstra  │  │
//! │  │  per node       │                   │ -> SIDs -> publish   │  │
//! │  └────────┬────────┘                   └──────────┬───────────┘  │
//! │           │                                       │              │
//! │  ┌────────▼───────────────────────────────────────▼───────────┐  │
//! │  │                  EMULATED NETWORK NODES                    │  │
//! │  │      probe commands | seg6 encap/decap route commands      │  │
//! │  └────────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod audit;
pub mod config;
pub mod controller;
pub mod planner;
pub mod publisher;
pub mod resolver;
pub mod runner;
pub mod telemetry;
pub mod topology;
pub mod weights;

use thiserror::Error;

pub use audit::AuditLog;
pub use config::TeConfig;
pub use controller::TeController;
pub use resolver::{AddressResolver, HostsTable};
pub use runner::{CommandRunner, NetnsRunner};
pub use telemetry::{NodeUsage, TelemetryCollector, TelemetrySnapshot};
pub use topology::{Topology, TopologyKind};
pub use weights::WeightEngine;

/// Control-plane error types
#[derive(Debug, Error)]
pub enum Error {
    /// Telemetry probe failed or returned unparseable output
    #[error("telemetry collection failed on {node}: {reason}")]
    Collection {
        /// Node whose probe failed
        node: String,
        /// What went wrong
        reason: String,
    },
    /// No route exists between the two nodes under the current topology
    #[error("no path from {src} to {dst}")]
    NoPath {
        /// Source node
        src: String,
        /// Destination node
        dst: String,
    },
    /// Command execution failed on a node
    #[error("command failed on {node} ({command}): {reason}")]
    Publish {
        /// Node the command ran on
        node: String,
        /// The command that failed
        command: String,
        /// What went wrong
        reason: String,
    },
    /// Address lookup returned no match
    #[error("no address for {name}")]
    Resolution {
        /// Name that could not be resolved
        name: String,
    },
    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;
