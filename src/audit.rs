//! Route Audit Log
//!
//! Append-only, human-readable journal of every published route. Purely
//! observational; publish failures are logged but never propagated from
//! here.

use chrono::Utc;
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::Write;

/// One audit block, written per publish call
#[derive(Debug, Clone)]
pub struct AuditRecord {
    /// Source host
    pub src: String,
    /// Destination host
    pub dst: String,
    /// Full computed path
    pub path: Vec<String>,
    /// Every command issued for this route, in order
    pub commands: Vec<String>,
}

/// Append-only audit sink shared by reference between publishers
pub struct AuditLog {
    out: Mutex<Box<dyn Write + Send>>,
}

impl AuditLog {
    /// Open (or create) an audit file in append mode
    pub fn open(path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::sink(file))
    }

    /// Audit log over an arbitrary writer
    pub fn sink(writer: impl Write + Send + 'static) -> Self {
        Self { out: Mutex::new(Box::new(writer)) }
    }

    /// Append one block; failures are logged and swallowed
    pub fn append(&self, record: &AuditRecord) {
        let mut block = format!(
            "[{}] route {} -> {}\n  path: {}\n",
            Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
            record.src,
            record.dst,
            record.path.join(" -> "),
        );
        for command in &record.commands {
            block.push_str("  cmd: ");
            block.push_str(command);
            block.push('\n');
        }

        let mut out = self.out.lock();
        if let Err(e) = out.write_all(block.as_bytes()).and_then(|()| out.flush()) {
            tracing::warn!(error = %e, "failed to append audit record");
        }
    }
}
