//! # Sourceguard Core
//!
//! Tamper-evident source integrity for a deployed code tree.
//! Orchestrates the Manifest Builder, the Key & Signature Manager and the
//! Fast Gate Verifier behind one facade.
//!
//! ## Threat Coverage
//!
//! | Layer | Component | Threats Detected |
//! |-------|-----------|------------------|
//! | Tree | Manifest Builder + Differ | Dropped webshells, edited sources, deleted files |
//! | Baseline | Signature Manager | Forged or edited manifests, swapped signatures |
//! | Request | Fast Gate Verifier | Tampered entry points, missing critical files |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      SOURCEGUARD CORE                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │   request ──► RequestGate ──► IntegrityOrchestrator             │
//! │                                      │                          │
//! │         ┌────────────────────────────┼──────────────────┐       │
//! │         ▼                            ▼                  ▼       │
//! │  ┌─────────────┐            ┌──────────────┐    ┌────────────┐  │
//! │  │  Manifest   │            │   Baseline   │    │  KeyStore  │  │
//! │  │  Builder    │            │    Store     │    │  (Ed25519) │  │
//! │  └─────────────┘            └──────────────┘    └────────────┘  │
//! │                                      │                          │
//! │                                      ▼                          │
//! │                                AuditSink(s)                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//!
//! `NoBaseline → Clean → Compromised → Clean`: a keypair is generated, the
//! live tree is approved (hashed, signed and swapped in atomically), and
//! every later scan or gate call compares against that signed baseline.
//! Only another approval returns a compromised tree to clean.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sourceguard_core::{ActorContext, GuardConfig, IntegrityOrchestrator, RequestContext};
//!
//! let config = GuardConfig::for_deployment("/srv/site", "/var/lib/sourceguard", &["index.php"]);
//! let guard = IntegrityOrchestrator::new(config)?;
//!
//! let admin = ActorContext::super_admin("ops", None);
//! guard.generate_keypair(&admin)?;
//! guard.approve(&admin)?;
//!
//! let report = guard.scan(&admin)?;
//! println!("{}", report.diff.summary());
//! ```
//!
//! ## Security Notes
//!
//! - The gate is fail-closed: no baseline, a bad signature, a missing key,
//!   an I/O error or a panic all deny the request
//! - The 403 body is generic; reasons go to the log and the audit sink only
//! - Approval and key rotation are mutually exclusive across threads and
//!   processes
//! - The orchestrator never decides authorization; it refuses to mutate
//!   unless the caller passes an elevated [`ActorContext`]

pub mod audit;
pub mod baseline;
mod config;
mod context;
mod error;
pub mod gate;
pub mod offload;
mod orchestrator;
mod verdict;

pub use audit::{
    AuditAction, AuditError, AuditLogEntry, AuditSink, FanoutAuditSink, MemoryAuditSink,
    Severity, SledAuditSink, TracingAuditSink,
};
pub use baseline::{Baseline, BaselineStore};
pub use config::{AuditConfig, GateConfig, GuardConfig, ResolvedConfig, ScopeConfig, StorageConfig};
pub use context::{ActorContext, RequestContext};
pub use error::GuardError;
pub use gate::{gate_check, GateResponse, RequestGate};
pub use orchestrator::{ApprovalReceipt, IntegrityOrchestrator, KeyInfo, ScanReport};
pub use verdict::{GateFailure, GateVerdict, IntegrityStatus};

// Re-export component types for convenience
pub use sourceguard_manifest::{DiffReport, Manifest, ManifestBuilder, PathClassifier};
pub use sourceguard_signing::{KeyStore, SignatureStatus};

/// Core result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, GuardError>;

#[cfg(test)]
mod tests;
