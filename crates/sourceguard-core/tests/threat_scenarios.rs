//! # Threat Scenario Tests
//!
//! Attacks against the baseline itself and the keys that protect it.
//!
//! ## Scenarios Covered
//!
//! 1. **Forged Baselines**: attacker edits a file and the manifest to match
//! 2. **Signature Tampering**: deleted, truncated or swapped signatures
//! 3. **Key Substitution**: attacker-generated keys in the key directory
//! 4. **Store Corruption**: broken pointer, missing manifest
//! 5. **Recovery**: key rotation and re-approval

use sourceguard_core::baseline::{MANIFEST_FILE, SIGNATURE_FILE};
use sourceguard_core::{
    ActorContext, BaselineStore, GateFailure, GateVerdict, GuardConfig, GuardError,
    IntegrityOrchestrator, IntegrityStatus, KeyStore, Manifest, MemoryAuditSink, SignatureStatus,
};
use sourceguard_manifest::{hash_bytes, manifest_digest};
use sourceguard_signing::sign;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

fn deploy(temp_dir: &TempDir) -> PathBuf {
    let root = temp_dir.path().join("site");
    fs::create_dir_all(root.join("app")).unwrap();
    fs::write(root.join("index.php"), "<?php require 'app/boot.ext';").unwrap();
    fs::write(root.join("app/boot.ext"), "<?php boot();").unwrap();
    fs::write(root.join("app/routes.ext"), "<?php routes();").unwrap();
    root
}

fn test_config(temp_dir: &TempDir, root: &Path) -> GuardConfig {
    GuardConfig::for_deployment(root, temp_dir.path().join("state"), &["index.php", "app/boot.ext"])
}

fn guard(config: GuardConfig) -> IntegrityOrchestrator {
    IntegrityOrchestrator::with_audit_sink(config, Arc::new(MemoryAuditSink::new())).unwrap()
}

fn admin() -> ActorContext {
    ActorContext::super_admin("admin", None)
}

/// Approved deployment: keypair generated, baseline signed.
fn approved(temp_dir: &TempDir) -> (PathBuf, IntegrityOrchestrator) {
    let root = deploy(temp_dir);
    let guard = guard(test_config(temp_dir, &root));
    guard.generate_keypair(&admin()).unwrap();
    guard.approve(&admin()).unwrap();
    assert!(guard.evaluate_gate().is_pass());
    (root, guard)
}

fn generation_dir(guard: &IntegrityOrchestrator) -> PathBuf {
    let store = guard.store();
    let generation = store.current_generation().unwrap().unwrap();
    store.generation_dir(&generation)
}

/// Rewrites the stored manifest so `path` carries the hash of `contents`.
fn forge_manifest(guard: &IntegrityOrchestrator, path: &str, contents: &[u8]) -> Manifest {
    let original = guard.store().load().unwrap().unwrap().manifest;
    let mut forged = Manifest::new();
    for (p, hash) in original.iter() {
        let hash = if p == path { hash_bytes(contents) } else { *hash };
        forged.insert(p, hash).unwrap();
    }
    fs::write(
        generation_dir(guard).join(MANIFEST_FILE),
        forged.to_json_pretty().unwrap(),
    )
    .unwrap();
    forged
}

// =============================================================================
// FORGED BASELINES
// =============================================================================

#[test]
fn test_scenario_file_and_manifest_edited_together() {
    let temp_dir = TempDir::new().unwrap();
    let (root, guard) = approved(&temp_dir);

    let payload = b"<?php boot(); @eval($_POST['x']);";
    fs::write(root.join("app/boot.ext"), payload).unwrap();
    forge_manifest(&guard, "app/boot.ext", payload);

    // Tree matches the forged manifest, but the signature does not.
    let report = guard.scan(&admin()).unwrap();
    assert!(report.diff.is_clean());
    assert_eq!(report.signature, SignatureStatus::Mismatched);
    assert_eq!(report.status, IntegrityStatus::Compromised);

    assert_eq!(
        guard.evaluate_gate(),
        GateVerdict::fail(GateFailure::SignatureMismatched)
    );
    assert!(!guard.verify());
}

#[test]
fn test_scenario_manifest_reformatted_still_verifies() {
    let temp_dir = TempDir::new().unwrap();
    let (_root, guard) = approved(&temp_dir);

    // Re-serializing the same mapping with different whitespace and key
    // order changes no hash: the digest is over the canonical form.
    let path = generation_dir(&guard).join(MANIFEST_FILE);
    let value: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

    assert!(guard.evaluate_gate().is_pass());
    assert_eq!(guard.status().unwrap(), IntegrityStatus::Clean);
}

#[test]
fn test_scenario_entry_dropped_from_manifest() {
    let temp_dir = TempDir::new().unwrap();
    let (_root, guard) = approved(&temp_dir);

    let original = guard.store().load().unwrap().unwrap().manifest;
    let mut trimmed = Manifest::new();
    for (p, hash) in original.iter().filter(|(p, _)| *p != "app/routes.ext") {
        trimmed.insert(p, *hash).unwrap();
    }
    fs::write(
        generation_dir(&guard).join(MANIFEST_FILE),
        trimmed.to_json_pretty().unwrap(),
    )
    .unwrap();

    assert_eq!(
        guard.evaluate_gate(),
        GateVerdict::fail(GateFailure::SignatureMismatched)
    );
}

// =============================================================================
// SIGNATURE TAMPERING
// =============================================================================

#[test]
fn test_scenario_signature_deleted() {
    let temp_dir = TempDir::new().unwrap();
    let (_root, guard) = approved(&temp_dir);

    fs::remove_file(generation_dir(&guard).join(SIGNATURE_FILE)).unwrap();

    assert_eq!(
        guard.evaluate_gate(),
        GateVerdict::fail(GateFailure::SignatureMissing)
    );
    assert_eq!(guard.scan(&admin()).unwrap().signature, SignatureStatus::Missing);
    assert_eq!(guard.status().unwrap(), IntegrityStatus::Compromised);
}

#[test]
fn test_scenario_signature_truncated() {
    let temp_dir = TempDir::new().unwrap();
    let (_root, guard) = approved(&temp_dir);

    let path = generation_dir(&guard).join(SIGNATURE_FILE);
    let sig = fs::read_to_string(&path).unwrap();
    fs::write(&path, &sig.trim()[..40]).unwrap();

    assert_eq!(
        guard.evaluate_gate(),
        GateVerdict::fail(GateFailure::SignatureMismatched)
    );
}

#[test]
fn test_scenario_signature_from_other_manifest() {
    let temp_dir = TempDir::new().unwrap();
    let (root, guard) = approved(&temp_dir);
    let old_sig = fs::read(generation_dir(&guard).join(SIGNATURE_FILE)).unwrap();

    // Second approval over a changed tree, then the old signature is
    // pasted next to the new manifest.
    fs::write(root.join("app/routes.ext"), "<?php routes(); extra();").unwrap();
    guard.approve(&admin()).unwrap();
    fs::write(generation_dir(&guard).join(SIGNATURE_FILE), old_sig).unwrap();

    assert_eq!(
        guard.evaluate_gate(),
        GateVerdict::fail(GateFailure::SignatureMismatched)
    );
}

// =============================================================================
// KEY SUBSTITUTION
// =============================================================================

#[test]
fn test_scenario_public_key_removed() {
    let temp_dir = TempDir::new().unwrap();
    let (_root, guard) = approved(&temp_dir);

    fs::remove_file(guard.key_store().public_key_path().unwrap().unwrap()).unwrap();
    assert_eq!(
        guard.evaluate_gate(),
        GateVerdict::fail(GateFailure::SignatureMissing)
    );
}

#[test]
fn test_scenario_attacker_resigns_with_own_key() {
    let temp_dir = TempDir::new().unwrap();
    let root = deploy(&temp_dir);
    let mut config = test_config(&temp_dir, &root);

    // Operator pins the public key in deployment configuration.
    let operator = guard(config.clone());
    let info = operator.generate_keypair(&admin()).unwrap();
    operator.approve(&admin()).unwrap();
    config.gate.trusted_public_key = Some(info.public_key);
    let pinned = guard(config);
    assert!(pinned.evaluate_gate().is_pass());

    // Attacker with write access replaces the key files, edits a file and
    // signs a matching manifest with their own key.
    let attacker_keys = KeyStore::new(pinned.key_store().dir()).generate_keypair().unwrap();
    fs::write(root.join("index.php"), "<?php backdoor();").unwrap();
    let mut forged = Manifest::new();
    for (p, hash) in pinned.store().load().unwrap().unwrap().manifest.iter() {
        let hash = if p == "index.php" { hash_bytes(b"<?php backdoor();") } else { *hash };
        forged.insert(p, hash).unwrap();
    }
    let signature = sign(&manifest_digest(&forged), attacker_keys.signing_key());
    BaselineStore::new(pinned.store().dir())
        .persist(&forged, &signature)
        .unwrap();

    assert_eq!(
        pinned.evaluate_gate(),
        GateVerdict::fail(GateFailure::SignatureMismatched)
    );

    // The pinned orchestrator also refuses to approve with the substituted key.
    assert!(matches!(
        pinned.approve(&admin()),
        Err(GuardError::KeyMismatch { .. })
    ));
}

// =============================================================================
// STORE CORRUPTION
// =============================================================================

#[test]
fn test_scenario_pointer_corrupted() {
    let temp_dir = TempDir::new().unwrap();
    let (_root, guard) = approved(&temp_dir);

    fs::write(guard.store().current_path(), "gen-doesnotexist\n").unwrap();
    assert!(matches!(
        guard.evaluate_gate().failure(),
        Some(GateFailure::BaselineCorrupt { .. })
    ));
    assert!(matches!(
        guard.scan(&admin()),
        Err(GuardError::BaselineCorrupt(_))
    ));
    assert_eq!(guard.status().unwrap(), IntegrityStatus::Compromised);
}

#[test]
fn test_scenario_pointer_removed() {
    let temp_dir = TempDir::new().unwrap();
    let (_root, guard) = approved(&temp_dir);

    fs::remove_file(guard.store().current_path()).unwrap();
    assert_eq!(guard.evaluate_gate(), GateVerdict::fail(GateFailure::NoBaseline));
    assert!(!guard.verify());
}

#[test]
fn test_scenario_critical_file_not_in_baseline() {
    let temp_dir = TempDir::new().unwrap();
    let root = deploy(&temp_dir);
    let operator = guard(test_config(&temp_dir, &root));
    operator.generate_keypair(&admin()).unwrap();
    operator.approve(&admin()).unwrap();

    // A later configuration names a critical file that was never approved.
    fs::write(root.join("app/kernel.ext"), "<?php kernel();").unwrap();
    let config = GuardConfig::for_deployment(
        &root,
        temp_dir.path().join("state"),
        &["index.php", "app/kernel.ext"],
    );
    assert_eq!(
        guard(config).evaluate_gate(),
        GateVerdict::fail(GateFailure::NotInBaseline {
            path: "app/kernel.ext".to_string()
        })
    );
}

// =============================================================================
// RECOVERY
// =============================================================================

#[test]
fn test_scenario_key_rotation_requires_reapproval() {
    let temp_dir = TempDir::new().unwrap();
    let (_root, guard) = approved(&temp_dir);
    let first = guard.key_store().load_verifying_key().unwrap();

    let info = guard.generate_keypair(&admin()).unwrap();
    assert!(info.previous_fingerprint.is_some());
    assert_eq!(
        guard.key_store().load_previous_verifying_key().unwrap(),
        Some(first)
    );

    assert_eq!(
        guard.evaluate_gate(),
        GateVerdict::fail(GateFailure::SignatureMismatched)
    );
    assert_eq!(guard.status().unwrap(), IntegrityStatus::Compromised);

    guard.approve(&admin()).unwrap();
    assert!(guard.evaluate_gate().is_pass());
    assert_eq!(guard.status().unwrap(), IntegrityStatus::Clean);
}

#[test]
fn test_scenario_restore_after_tamper() {
    let temp_dir = TempDir::new().unwrap();
    let (root, guard) = approved(&temp_dir);

    fs::write(root.join("index.php"), "<?php hacked();").unwrap();
    assert!(!guard.evaluate_gate().is_pass());

    // Restoring the original bytes is enough; no re-approval needed.
    fs::write(root.join("index.php"), "<?php require 'app/boot.ext';").unwrap();
    assert!(guard.evaluate_gate().is_pass());
    assert_eq!(guard.status().unwrap(), IntegrityStatus::Clean);
}

#[test]
fn test_scenario_keys_reusable_across_processes() {
    let temp_dir = TempDir::new().unwrap();
    let (root, first) = approved(&temp_dir);
    drop(first);

    // A fresh orchestrator over the same state sees the same signed baseline.
    let second = guard(test_config(&temp_dir, &root));
    assert!(second.evaluate_gate().is_pass());
    assert_eq!(second.status().unwrap(), IntegrityStatus::Clean);
}
