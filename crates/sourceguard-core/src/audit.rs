//! # Audit Trail
//!
//! Every state-changing or security-relevant operation produces exactly one
//! [`AuditLogEntry`], handed to an [`AuditSink`]. The sink format is an
//! external contract; this module only guarantees the fields.
//!
//! ## Sinks
//!
//! | Sink | Storage | Use |
//! |------|---------|-----|
//! | [`TracingAuditSink`] | `tracing` events on `sourceguard::audit` | Default, log shipping |
//! | [`SledAuditSink`] | Sled tree, append-only | Durable local trail |
//! | [`MemoryAuditSink`] | `Vec` behind a mutex | Embedding, tests |
//! | [`FanoutAuditSink`] | Forwards to several sinks | Combining the above |
//!
//! ## Security Notes
//!
//! - A failing sink never changes a security decision. A gate failure stays
//!   a failure and a completed approval stays completed; the sink error is
//!   logged instead.
//! - Sled keys are monotonically increasing ids, so iteration order is
//!   write order and entries are never overwritten.

use crate::context::ActorContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Tracing target for audit events.
pub const AUDIT_TARGET: &str = "sourceguard::audit";

const AUDIT_TREE: &str = "audit";

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Full-tree scan.
    Scan,
    /// Full-tree verification (startup or scheduled).
    Verify,
    /// Baseline regenerated and re-signed.
    Approve,
    /// Signing keypair replaced.
    GenerateKeypair,
    /// Request gate denied traffic.
    GateFailure,
    /// Mutating call refused for lack of privilege.
    AuthorizationDenied,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Scan => "scan",
            Self::Verify => "verify",
            Self::Approve => "approve",
            Self::GenerateKeypair => "generate_keypair",
            Self::GateFailure => "gate_failure",
            Self::AuthorizationDenied => "authorization_denied",
        };
        f.write_str(name)
    }
}

/// How much attention an entry needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Routine.
    Info,
    /// Security-relevant, expected.
    Warning,
    /// Integrity failure.
    Critical,
}

/// One audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Unique entry id.
    pub id: Uuid,

    /// What happened.
    pub action: AuditAction,

    /// Who or what triggered it.
    pub actor: ActorContext,

    /// When it happened.
    pub timestamp: DateTime<Utc>,

    /// How serious it is.
    pub severity: Severity,

    /// Human-readable description.
    pub description: String,

    /// Structured detail.
    pub detail: serde_json::Value,
}

impl AuditLogEntry {
    /// Creates an entry stamped now.
    pub fn new(
        action: AuditAction,
        actor: ActorContext,
        severity: Severity,
        description: impl Into<String>,
        detail: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            action,
            actor,
            timestamp: Utc::now(),
            severity,
            description: description.into(),
            detail,
        }
    }
}

/// Errors raised by audit sinks.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Sled storage failure.
    #[error("audit storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Entry could not be encoded or decoded.
    #[error("audit serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Destination for audit entries.
pub trait AuditSink: Send + Sync {
    /// Records one entry.
    fn record(&self, entry: &AuditLogEntry) -> Result<(), AuditError>;
}

/// Emits entries as structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: &AuditLogEntry) -> Result<(), AuditError> {
        let detail = entry.detail.to_string();
        let actor = entry.actor.to_string();
        match entry.severity {
            Severity::Info => info!(
                target: AUDIT_TARGET,
                id = %entry.id,
                action = %entry.action,
                actor = %actor,
                detail = %detail,
                "{}",
                entry.description
            ),
            Severity::Warning => warn!(
                target: AUDIT_TARGET,
                id = %entry.id,
                action = %entry.action,
                actor = %actor,
                detail = %detail,
                "{}",
                entry.description
            ),
            Severity::Critical => error!(
                target: AUDIT_TARGET,
                id = %entry.id,
                action = %entry.action,
                actor = %actor,
                detail = %detail,
                "{}",
                entry.description
            ),
        }
        Ok(())
    }
}

/// Append-only audit trail in a Sled database.
#[derive(Clone)]
pub struct SledAuditSink {
    db: sled::Db,
    entries: sled::Tree,
}

impl SledAuditSink {
    /// Opens or creates the audit database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AuditError> {
        let db = sled::open(path)?;
        let entries = db.open_tree(AUDIT_TREE)?;
        Ok(Self { db, entries })
    }

    /// An in-memory database that is discarded on drop.
    pub fn temporary() -> Result<Self, AuditError> {
        let db = sled::Config::new().temporary(true).open()?;
        let entries = db.open_tree(AUDIT_TREE)?;
        Ok(Self { db, entries })
    }

    /// All entries in write order.
    pub fn entries(&self) -> Result<Vec<AuditLogEntry>, AuditError> {
        let mut out = Vec::with_capacity(self.entries.len());
        for item in self.entries.iter() {
            let (_, value) = item?;
            out.push(serde_json::from_slice(&value)?);
        }
        Ok(out)
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AuditSink for SledAuditSink {
    fn record(&self, entry: &AuditLogEntry) -> Result<(), AuditError> {
        let key = self.db.generate_id()?.to_be_bytes();
        let value = serde_json::to_vec(entry)?;
        self.entries.insert(key, value)?;
        self.db.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for SledAuditSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledAuditSink")
            .field("entries", &self.len())
            .finish()
    }
}

/// Keeps entries in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditLogEntry>>,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded entries.
    pub fn entries(&self) -> Vec<AuditLogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Entries with the given action.
    pub fn with_action(&self, action: AuditAction) -> Vec<AuditLogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.action == action)
            .collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, entry: &AuditLogEntry) -> Result<(), AuditError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());
        Ok(())
    }
}

/// Forwards each entry to every inner sink.
#[derive(Default, Clone)]
pub struct FanoutAuditSink {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl FanoutAuditSink {
    /// Creates an empty fan-out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sink.
    pub fn with(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Number of inner sinks.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Returns true if there are no inner sinks.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl AuditSink for FanoutAuditSink {
    /// Every sink is attempted; the first error is returned.
    fn record(&self, entry: &AuditLogEntry) -> Result<(), AuditError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.record(entry) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(action: AuditAction, severity: Severity) -> AuditLogEntry {
        AuditLogEntry::new(
            action,
            ActorContext::super_admin("ops", Some("192.0.2.7".to_string())),
            severity,
            "test entry",
            json!({ "files": 3 }),
        )
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Critical);
    }

    #[test]
    fn test_entry_serialization() {
        let e = entry(AuditAction::Approve, Severity::Warning);
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["action"], "approve");
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["actor"]["ip"], "192.0.2.7");

        let parsed: AuditLogEntry = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, e);
    }

    #[test]
    fn test_sled_sink_appends_in_order() {
        let sink = SledAuditSink::temporary().unwrap();
        assert!(sink.is_empty());

        sink.record(&entry(AuditAction::Scan, Severity::Info)).unwrap();
        sink.record(&entry(AuditAction::Approve, Severity::Warning)).unwrap();
        sink.record(&entry(AuditAction::GateFailure, Severity::Critical))
            .unwrap();

        let actions: Vec<AuditAction> = sink.entries().unwrap().iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![AuditAction::Scan, AuditAction::Approve, AuditAction::GateFailure]
        );
    }

    #[test]
    fn test_memory_sink_filters() {
        let sink = MemoryAuditSink::new();
        sink.record(&entry(AuditAction::Scan, Severity::Info)).unwrap();
        sink.record(&entry(AuditAction::GateFailure, Severity::Critical))
            .unwrap();
        assert_eq!(sink.entries().len(), 2);
        assert_eq!(sink.with_action(AuditAction::GateFailure).len(), 1);
    }

    #[test]
    fn test_fanout_reaches_every_sink() {
        let a = Arc::new(MemoryAuditSink::new());
        let b = Arc::new(MemoryAuditSink::new());
        let fanout = FanoutAuditSink::new()
            .with(a.clone())
            .with(b.clone())
            .with(Arc::new(TracingAuditSink));
        assert_eq!(fanout.len(), 3);

        fanout.record(&entry(AuditAction::Verify, Severity::Info)).unwrap();
        assert_eq!(a.entries().len(), 1);
        assert_eq!(b.entries().len(), 1);
    }
}
