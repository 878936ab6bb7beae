//! The Integrity Orchestrator.
//!
//! This module provides the main entry point for Sourceguard. The
//! [`IntegrityOrchestrator`] owns the baseline and keypair lifecycle and
//! exposes the admin operations plus the per-request gate.

use crate::{
    audit::{
        AuditAction, AuditLogEntry, AuditSink, FanoutAuditSink, Severity, SledAuditSink,
        TracingAuditSink,
    },
    baseline::{Baseline, BaselineStore},
    config::{GuardConfig, ResolvedConfig},
    context::{ActorContext, RequestContext},
    error::GuardError,
    gate::gate_check,
    verdict::{GateFailure, GateVerdict, IntegrityStatus},
    Result,
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use sourceguard_manifest::{diff, manifest_digest, DiffReport, Hash, Manifest, ManifestBuilder};
use sourceguard_signing::{
    public_key_fingerprint, sign, verify, KeyStore, SignatureStatus, SigningError, VerifyingKey,
};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, RwLock, TryLockError};
use tracing::{debug, error, info, warn};

/// Result of a full-tree scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    /// Overall status.
    pub status: IntegrityStatus,

    /// Baseline signature check.
    pub signature: SignatureStatus,

    /// Added, modified and deleted paths.
    #[serde(flatten)]
    pub diff: DiffReport,

    /// Files in the live tree.
    pub current_files: usize,

    /// Files in the baseline, if one exists.
    pub baseline_files: Option<usize>,

    /// Active baseline generation, if one exists.
    pub baseline_generation: Option<String>,
}

/// Returned by a successful approval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalReceipt {
    /// New baseline generation.
    pub generation: String,
    /// Hex manifest digest that was signed.
    pub digest: String,
    /// Number of files in the approved manifest.
    pub file_count: usize,
    /// Approval time.
    pub approved_at: DateTime<Utc>,
}

/// Returned by key generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyInfo {
    /// Hex public key.
    pub public_key: String,
    /// Short fingerprint of the public key.
    pub fingerprint: String,
    /// Fingerprint of the replaced key, if any.
    pub previous_fingerprint: Option<String>,
}

/// Fingerprint of the last baseline that fully verified.
struct VerifiedBaseline {
    fingerprint: Hash,
    manifest: Arc<Manifest>,
}

/// The Sourceguard integrity facade.
///
/// # Security Model
///
/// - Baseline and signature are read together and verified on every gate
///   call. Nothing is trusted because it was trusted before.
/// - `approve` and `generate_keypair` refuse callers whose context is not
///   elevated, before touching the filesystem.
/// - One approval at a time: an in-process mutex plus a file lock in the
///   baseline directory. A second caller gets
///   [`GuardError::ApprovalInProgress`].
/// - The gate is fail-closed: errors and panics inside it deny the request.
///
/// # Example
///
/// ```rust,ignore
/// let guard = IntegrityOrchestrator::new(GuardConfig::from_file("sourceguard.json")?)?;
///
/// let admin = ActorContext::super_admin("ops", None);
/// guard.generate_keypair(&admin)?;
/// guard.approve(&admin)?;
///
/// if !guard.validate_source_integrity(&RequestContext::from_ip("203.0.113.9")) {
///     // respond 403
/// }
/// ```
pub struct IntegrityOrchestrator {
    config: GuardConfig,
    resolved: ResolvedConfig,
    builder: ManifestBuilder,
    store: BaselineStore,
    keys: KeyStore,
    audit: Arc<dyn AuditSink>,

    /// Serializes approve and keygen within this process.
    approval: Mutex<()>,

    /// Readers share; the baseline swap is exclusive.
    swap: RwLock<()>,

    verified: RwLock<Option<VerifiedBaseline>>,
}

impl IntegrityOrchestrator {
    /// Create an orchestrator with the sinks named in `config.audit`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration does not validate
    /// - The audit database cannot be opened
    pub fn new(config: GuardConfig) -> Result<Self> {
        let mut fanout = FanoutAuditSink::new();
        if config.audit.log_to_tracing {
            fanout = fanout.with(Arc::new(TracingAuditSink));
        }
        if let Some(db_path) = &config.audit.db_path {
            fanout = fanout.with(Arc::new(SledAuditSink::open(db_path)?));
        }
        Self::with_audit_sink(config, Arc::new(fanout))
    }

    /// Create an orchestrator that records audit entries to `audit`.
    pub fn with_audit_sink(config: GuardConfig, audit: Arc<dyn AuditSink>) -> Result<Self> {
        let resolved = config.validate()?;
        let builder = ManifestBuilder::new(resolved.classifier.clone());
        let store = BaselineStore::new(&resolved.baseline_dir);
        let keys = KeyStore::new(&resolved.key_dir);

        info!(
            root = %resolved.deployment_root.display(),
            critical = resolved.critical_paths.len(),
            "Integrity orchestrator initialized"
        );

        Ok(Self {
            config,
            resolved,
            builder,
            store,
            keys,
            audit,
            approval: Mutex::new(()),
            swap: RwLock::new(()),
            verified: RwLock::new(None),
        })
    }

    /// The configuration this orchestrator was built from.
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Absolute deployment root.
    pub fn deployment_root(&self) -> &Path {
        &self.resolved.deployment_root
    }

    /// Normalized critical paths.
    pub fn critical_paths(&self) -> &[String] {
        &self.resolved.critical_paths
    }

    /// The baseline store.
    pub fn store(&self) -> &BaselineStore {
        &self.store
    }

    /// The key store.
    pub fn key_store(&self) -> &KeyStore {
        &self.keys
    }

    // =========================================================================
    // Read operations
    // =========================================================================

    /// Builds the live manifest and compares it with the baseline.
    ///
    /// Never mutates state. Records one audit entry: `Info` when clean,
    /// `Warning` with no baseline, `Critical` when compromised or failed.
    pub fn scan(&self, actor: &ActorContext) -> Result<ScanReport> {
        let result = self.build_report();
        match &result {
            Ok(report) => {
                let severity = match report.status {
                    IntegrityStatus::Clean => Severity::Info,
                    IntegrityStatus::NoBaseline => Severity::Warning,
                    IntegrityStatus::Compromised => Severity::Critical,
                };
                self.record(
                    AuditAction::Scan,
                    actor.clone(),
                    severity,
                    format!("Scan: {}, {}", report.status, report.diff.summary()),
                    report_detail(report),
                );
            }
            Err(e) => self.record(
                AuditAction::Scan,
                actor.clone(),
                Severity::Critical,
                format!("Scan failed: {}", e),
                json!({ "error": e.to_string() }),
            ),
        }
        result
    }

    /// Full-tree, fail-closed verification.
    ///
    /// Returns true only if a signed baseline exists, its signature verifies
    /// and the live tree matches it exactly.
    pub fn verify(&self) -> bool {
        let actor = ActorContext {
            principal: Some("system".to_string()),
            ..ActorContext::default()
        };
        match self.build_report() {
            Ok(report) if report.status.is_clean() => {
                self.record(
                    AuditAction::Verify,
                    actor,
                    Severity::Info,
                    "Full verification passed",
                    report_detail(&report),
                );
                true
            }
            Ok(report) => {
                self.record(
                    AuditAction::Verify,
                    actor,
                    Severity::Critical,
                    format!(
                        "Full verification failed: {}, signature {}, {}",
                        report.status,
                        report.signature,
                        report.diff.summary()
                    ),
                    report_detail(&report),
                );
                false
            }
            Err(e) => {
                self.record(
                    AuditAction::Verify,
                    actor,
                    Severity::Critical,
                    format!("Full verification failed: {}", e),
                    json!({ "error": e.to_string() }),
                );
                false
            }
        }
    }

    /// Current whole-tree status. Not audited.
    ///
    /// A corrupt baseline reports `Compromised`.
    pub fn status(&self) -> Result<IntegrityStatus> {
        match self.build_report() {
            Ok(report) => Ok(report.status),
            Err(GuardError::BaselineCorrupt(detail)) => {
                warn!(detail = %detail, "Baseline corrupt");
                Ok(IntegrityStatus::Compromised)
            }
            Err(e) => Err(e),
        }
    }

    fn build_report(&self) -> Result<ScanReport> {
        let current = self.builder.build()?;
        let baseline = self.load_baseline()?;

        let Some(baseline) = baseline else {
            return Ok(ScanReport {
                status: IntegrityStatus::NoBaseline,
                signature: SignatureStatus::Missing,
                diff: diff(&current, &Manifest::new()),
                current_files: current.len(),
                baseline_files: None,
                baseline_generation: None,
            });
        };

        let signature = self.signature_status(&baseline);
        let diff = diff(&current, &baseline.manifest);
        let status = if diff.is_clean() && signature.is_verified() {
            IntegrityStatus::Clean
        } else {
            IntegrityStatus::Compromised
        };

        debug!(status = %status, signature = %signature, "Scan complete");
        Ok(ScanReport {
            status,
            signature,
            diff,
            current_files: current.len(),
            baseline_files: Some(baseline.manifest.len()),
            baseline_generation: Some(baseline.generation),
        })
    }

    fn load_baseline(&self) -> Result<Option<Baseline>> {
        let _guard = self.swap.read().unwrap_or_else(PoisonError::into_inner);
        self.store.load()
    }

    fn signature_status(&self, baseline: &Baseline) -> SignatureStatus {
        if baseline.signature_malformed {
            return SignatureStatus::Mismatched;
        }
        let key = self.verifying_key();
        verify(&baseline.digest, baseline.signature.as_ref(), key.as_ref())
    }

    /// The public key signatures are checked against.
    ///
    /// The configured trusted key wins over the key directory.
    pub fn verifying_key(&self) -> Option<VerifyingKey> {
        if let Some(key) = self.resolved.trusted_public_key {
            return Some(key);
        }
        match self.keys.load_verifying_key() {
            Ok(key) => Some(key),
            Err(SigningError::KeyNotFound(_)) => None,
            Err(e) => {
                warn!(error = %e, "Cannot load public key");
                None
            }
        }
    }

    // =========================================================================
    // Mutating operations
    // =========================================================================

    /// Rebuilds the manifest from the live tree, signs it and atomically
    /// replaces the baseline.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if `actor` is not elevated
    /// - `ApprovalInProgress` if another approval or keygen is running
    /// - `KeyMismatch` if the stored signing key is not the trusted key
    /// - `Signing(KeyNotFound)` if no keypair has been generated
    pub fn approve(&self, actor: &ActorContext) -> Result<ApprovalReceipt> {
        self.authorize(actor, "approve")?;
        let _local = self.lock_approval()?;
        let _file = self.store.try_lock()?;

        let keys = self.keys.load_keypair()?;
        if let Some(trusted) = &self.resolved.trusted_public_key {
            if *trusted != keys.verifying_key() {
                return Err(GuardError::KeyMismatch {
                    signing: keys.fingerprint(),
                    trusted: public_key_fingerprint(trusted),
                });
            }
        }

        let previous = match self.load_baseline() {
            Ok(previous) => previous,
            Err(e) => {
                warn!(error = %e, "Replacing unreadable baseline");
                None
            }
        };

        let manifest = self.builder.build()?;
        let digest = manifest_digest(&manifest);
        let signature = sign(&digest, keys.signing_key());

        let generation = {
            let _guard = self.swap.write().unwrap_or_else(PoisonError::into_inner);
            self.store.persist(&manifest, &signature)?
        };

        let receipt = ApprovalReceipt {
            generation,
            digest: hex::encode(digest),
            file_count: manifest.len(),
            approved_at: Utc::now(),
        };

        let changes = previous.as_ref().map(|p| diff(&manifest, &p.manifest));
        self.record(
            AuditAction::Approve,
            actor.clone(),
            Severity::Warning,
            format!(
                "Baseline approved: {} files, generation {}",
                receipt.file_count, receipt.generation
            ),
            json!({
                "generation": receipt.generation,
                "files": receipt.file_count,
                "digest": receipt.digest,
                "previous_digest": previous.as_ref().map(|p| hex::encode(p.digest)),
                "changes": changes.as_ref().map(|d| d.summary()),
                "key": keys.fingerprint(),
            }),
        );

        Ok(receipt)
    }

    /// Replaces the signing keypair.
    ///
    /// Existing baselines stop verifying until the next [`approve`](Self::approve).
    pub fn generate_keypair(&self, actor: &ActorContext) -> Result<KeyInfo> {
        self.authorize(actor, "generate keypair")?;
        let _local = self.lock_approval()?;
        let _file = self.store.try_lock()?;

        let previous_fingerprint = self
            .keys
            .load_verifying_key()
            .ok()
            .map(|k| public_key_fingerprint(&k));
        let keys = self.keys.generate_keypair()?;

        if self.resolved.trusted_public_key.is_some() {
            warn!("gate.trusted_public_key is set; update it to the new public key before approving");
        }
        warn!(
            fingerprint = %keys.fingerprint(),
            "Signing key replaced; the current baseline will fail verification until re-approved"
        );

        let info = KeyInfo {
            public_key: keys.public_key_hex(),
            fingerprint: keys.fingerprint(),
            previous_fingerprint,
        };

        self.record(
            AuditAction::GenerateKeypair,
            actor.clone(),
            Severity::Warning,
            "Signing keypair generated; baseline must be re-approved",
            json!({
                "fingerprint": info.fingerprint,
                "previous_fingerprint": info.previous_fingerprint,
                "reapproval_required": true,
            }),
        );
        Ok(info)
    }

    fn authorize(&self, actor: &ActorContext, operation: &str) -> Result<()> {
        if actor.elevated {
            return Ok(());
        }
        self.record(
            AuditAction::AuthorizationDenied,
            actor.clone(),
            Severity::Warning,
            format!("Refused unauthorized {}", operation),
            json!({ "operation": operation }),
        );
        Err(GuardError::Unauthorized {
            operation: operation.to_string(),
        })
    }

    fn lock_approval(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        match self.approval.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => Err(GuardError::ApprovalInProgress),
        }
    }

    // =========================================================================
    // Request gate
    // =========================================================================

    /// The per-request check. Returns false on any failure, error or panic.
    ///
    /// Failures are logged and audited at `Critical` with the caller's
    /// request context.
    pub fn validate_source_integrity(&self, request: &RequestContext) -> bool {
        self.check_request(request).is_pass()
    }

    /// Like [`validate_source_integrity`](Self::validate_source_integrity),
    /// returning the verdict that was audited.
    ///
    /// Never panics: a panic in the gate or in the audit sink becomes a
    /// failing verdict.
    pub fn check_request(&self, request: &RequestContext) -> GateVerdict {
        let verdict = catch_unwind(AssertUnwindSafe(|| self.evaluate_gate())).unwrap_or_else(|_| {
            GateVerdict::fail(GateFailure::Internal {
                detail: "gate panicked".to_string(),
            })
        });

        if let GateVerdict::Fail { reason } = &verdict {
            error!(
                ip = request.ip.as_deref().unwrap_or("-"),
                reason = %reason,
                "Source integrity gate failed"
            );
            let recorded = catch_unwind(AssertUnwindSafe(|| {
                self.record(
                    AuditAction::GateFailure,
                    ActorContext {
                        principal: None,
                        ip: request.ip.clone(),
                        elevated: false,
                    },
                    Severity::Critical,
                    format!("Request blocked: {}", reason),
                    json!({
                        "reason": reason,
                        "method": request.method,
                        "path": request.path,
                    }),
                )
            }));
            if recorded.is_err() {
                error!(reason = %reason, "Audit sink panicked while recording a gate failure");
            }
        }
        verdict
    }

    /// Evaluates the gate and returns the detailed verdict.
    ///
    /// Checks the baseline signature, then the critical files. Not audited.
    pub fn evaluate_gate(&self) -> GateVerdict {
        let manifest = match self.verified_manifest() {
            Ok(manifest) => manifest,
            Err(reason) => return GateVerdict::fail(reason),
        };
        gate_check(
            &self.resolved.deployment_root,
            &manifest,
            &self.resolved.critical_paths,
        )
    }

    /// Loads the baseline and returns its manifest only if the signature
    /// verifies. Reuses the previous parse when files and key are unchanged.
    fn verified_manifest(&self) -> std::result::Result<Arc<Manifest>, GateFailure> {
        let raw = {
            let _guard = self.swap.read().unwrap_or_else(PoisonError::into_inner);
            self.store.load_raw()
        };
        let raw = match raw {
            Ok(Some(raw)) => raw,
            Ok(None) => return Err(GateFailure::NoBaseline),
            Err(e) => {
                return Err(GateFailure::BaselineCorrupt {
                    detail: e.to_string(),
                })
            }
        };
        let key = self.verifying_key().ok_or(GateFailure::SignatureMissing)?;

        let mut hasher = Sha256::new();
        hasher.update(raw.generation.as_bytes());
        hasher.update((raw.manifest_bytes.len() as u64).to_be_bytes());
        hasher.update(&raw.manifest_bytes);
        hasher.update(raw.signature_bytes.as_deref().unwrap_or_default());
        hasher.update(key.as_bytes());
        let fingerprint: Hash = hasher.finalize().into();

        if let Some(cached) = self
            .verified
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|c| c.fingerprint == fingerprint)
        {
            return Ok(Arc::clone(&cached.manifest));
        }

        let baseline = raw.parse().map_err(|e| GateFailure::BaselineCorrupt {
            detail: e.to_string(),
        })?;
        match self.signature_status(&baseline) {
            SignatureStatus::Verified => {}
            SignatureStatus::Mismatched => return Err(GateFailure::SignatureMismatched),
            SignatureStatus::Missing => return Err(GateFailure::SignatureMissing),
        }

        let manifest = Arc::new(baseline.manifest);
        *self.verified.write().unwrap_or_else(PoisonError::into_inner) = Some(VerifiedBaseline {
            fingerprint,
            manifest: Arc::clone(&manifest),
        });
        Ok(manifest)
    }

    fn record(
        &self,
        action: AuditAction,
        actor: ActorContext,
        severity: Severity,
        description: impl Into<String>,
        detail: serde_json::Value,
    ) {
        let entry = AuditLogEntry::new(action, actor, severity, description, detail);
        if let Err(e) = self.audit.record(&entry) {
            error!(action = %action, error = %e, "Failed to record audit entry");
        }
    }
}

impl std::fmt::Debug for IntegrityOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrityOrchestrator")
            .field("deployment_root", &self.resolved.deployment_root)
            .field("critical_paths", &self.resolved.critical_paths)
            .field("baseline_dir", &self.store.dir())
            .field("key_dir", &self.keys.dir())
            .finish()
    }
}

fn report_detail(report: &ScanReport) -> serde_json::Value {
    json!({
        "status": report.status,
        "signature": report.signature,
        "added": report.diff.added,
        "modified": report.diff.modified,
        "deleted": report.diff.deleted,
        "current_files": report.current_files,
        "baseline_files": report.baseline_files,
        "generation": report.baseline_generation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditError, MemoryAuditSink};
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<MemoryAuditSink>, IntegrityOrchestrator) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("site");
        fs::create_dir_all(root.join("app")).unwrap();
        fs::write(root.join("index.php"), b"<?php require 'app/boot.php';").unwrap();
        fs::write(root.join("app/boot.php"), b"<?php boot();").unwrap();

        let config =
            GuardConfig::for_deployment(&root, dir.path().join("state"), &["index.php"]);
        let sink = Arc::new(MemoryAuditSink::new());
        let guard = IntegrityOrchestrator::with_audit_sink(config, sink.clone()).unwrap();
        (dir, sink, guard)
    }

    fn admin() -> ActorContext {
        ActorContext::super_admin("admin", Some("127.0.0.1".to_string()))
    }

    #[test]
    fn test_scan_without_baseline() {
        let (_dir, _sink, guard) = setup();
        let report = guard.scan(&admin()).unwrap();
        assert_eq!(report.status, IntegrityStatus::NoBaseline);
        assert_eq!(report.signature, SignatureStatus::Missing);
        assert_eq!(report.diff.added.len(), 2);
        assert!(report.baseline_files.is_none());
    }

    #[test]
    fn test_approve_requires_keypair() {
        let (_dir, _sink, guard) = setup();
        assert!(matches!(
            guard.approve(&admin()),
            Err(GuardError::Signing(SigningError::KeyNotFound(_)))
        ));
        assert!(!guard.store().exists());
    }

    #[test]
    fn test_approve_then_clean() {
        let (_dir, sink, guard) = setup();
        guard.generate_keypair(&admin()).unwrap();
        let receipt = guard.approve(&admin()).unwrap();
        assert_eq!(receipt.file_count, 2);
        assert_eq!(receipt.digest.len(), 64);

        assert_eq!(guard.status().unwrap(), IntegrityStatus::Clean);
        assert!(guard.evaluate_gate().is_pass());
        assert_eq!(sink.with_action(AuditAction::Approve).len(), 1);
    }

    #[test]
    fn test_gate_cache_notices_signature_change() {
        let (_dir, _sink, guard) = setup();
        guard.generate_keypair(&admin()).unwrap();
        let receipt = guard.approve(&admin()).unwrap();
        assert!(guard.evaluate_gate().is_pass());

        let sig = guard
            .store()
            .generation_dir(&receipt.generation)
            .join(crate::baseline::SIGNATURE_FILE);
        fs::write(&sig, "00".repeat(64)).unwrap();
        assert_eq!(
            guard.evaluate_gate(),
            GateVerdict::fail(GateFailure::SignatureMismatched)
        );
    }

    struct PanickingSink;

    impl AuditSink for PanickingSink {
        fn record(&self, _entry: &AuditLogEntry) -> std::result::Result<(), AuditError> {
            panic!("sink exploded");
        }
    }

    #[test]
    fn test_gate_survives_panicking_audit_sink() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("site");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("index.php"), b"<?php").unwrap();
        let config = GuardConfig::for_deployment(&root, dir.path().join("state"), &["index.php"]);
        let guard = IntegrityOrchestrator::with_audit_sink(config, Arc::new(PanickingSink)).unwrap();

        // No baseline, so the gate fails and tries to audit.
        assert!(!guard.validate_source_integrity(&RequestContext::default()));
        assert_eq!(
            guard.check_request(&RequestContext::default()),
            GateVerdict::fail(GateFailure::NoBaseline)
        );
    }

    #[test]
    fn test_check_request_audits_the_returned_verdict() {
        let (_dir, sink, guard) = setup();
        let verdict = guard.check_request(&RequestContext::from_ip("198.51.100.7"));
        assert_eq!(verdict, GateVerdict::fail(GateFailure::NoBaseline));

        let failures = sink.with_action(AuditAction::GateFailure);
        assert_eq!(failures.len(), 1);
        assert_eq!(
            failures[0].detail["reason"],
            serde_json::to_value(GateFailure::NoBaseline).unwrap()
        );

        guard.generate_keypair(&admin()).unwrap();
        guard.approve(&admin()).unwrap();
        assert!(guard.check_request(&RequestContext::default()).is_pass());
        assert_eq!(sink.with_action(AuditAction::GateFailure).len(), 1);
    }

    #[test]
    fn test_approval_mutex_rejects_reentry() {
        let (_dir, _sink, guard) = setup();
        guard.generate_keypair(&admin()).unwrap();

        let held = guard.lock_approval().unwrap();
        assert!(matches!(
            guard.approve(&admin()),
            Err(GuardError::ApprovalInProgress)
        ));
        drop(held);
        assert!(guard.approve(&admin()).is_ok());
    }
}
