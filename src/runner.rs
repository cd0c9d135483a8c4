//! Node Command Execution
//!
//! Collaborator seam to the emulation environment: run a shell command on
//! an emulated node and return its output.

use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Executes shell commands on emulated nodes
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` on `node`, returning its stdout
    async fn run(&self, node: &str, command: &str) -> Result<String>;
}

/// Runs commands inside per-node network namespaces
///
/// Assumes the emulator gave every node a named netns matching its node
/// name, the usual arrangement for namespace-backed emulation.
#[derive(Debug)]
pub struct NetnsRunner {
    timeout: Duration,
}

impl NetnsRunner {
    /// New runner; every command runs under `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for NetnsRunner {
    async fn run(&self, node: &str, command: &str) -> Result<String> {
        let mut cmd = tokio::process::Command::new("ip");
        cmd.args(["netns", "exec", node, "sh", "-c", command]);

        tracing::debug!(node, command, "running command");

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| Error::Publish {
                node: node.to_string(),
                command: command.to_string(),
                reason: format!("timed out after {:?}", self.timeout),
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::debug!(node, command, %stderr, status = ?output.status, "command returned non-zero status");
            return Err(Error::Publish {
                node: node.to_string(),
                command: command.to_string(),
                reason: format!("exit {:?}: {stderr}", output.status.code()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::{HashMap, VecDeque};

    /// Scripted runner for tests: records every call and replays queued
    /// responses per node. Unscripted calls succeed with empty output.
    #[derive(Default)]
    pub(crate) struct MockRunner {
        pub(crate) calls: Mutex<Vec<(String, String)>>,
        responses: Mutex<HashMap<String, VecDeque<std::result::Result<String, String>>>>,
    }

    impl MockRunner {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn script(&self, node: &str, output: &str) {
            self.responses
                .lock()
                .entry(node.to_string())
                .or_default()
                .push_back(Ok(output.to_string()));
        }

        pub(crate) fn fail(&self, node: &str, reason: &str) {
            self.responses
                .lock()
                .entry(node.to_string())
                .or_default()
                .push_back(Err(reason.to_string()));
        }

        pub(crate) fn commands_on(&self, node: &str) -> Vec<String> {
            self.calls
                .lock()
                .iter()
                .filter(|(n, _)| n == node)
                .map(|(_, c)| c.clone())
                .collect()
        }
    }

    #[async_trait]
    impl CommandRunner for MockRunner {
        async fn run(&self, node: &str, command: &str) -> Result<String> {
            self.calls.lock().push((node.to_string(), command.to_string()));
            match self.responses.lock().get_mut(node).and_then(VecDeque::pop_front) {
                Some(Ok(output)) => Ok(output),
                Some(Err(reason)) => Err(Error::Publish {
                    node: node.to_string(),
                    command: command.to_string(),
                    reason,
                }),
                None => Ok(String::new()),
            }
        }
    }
}
