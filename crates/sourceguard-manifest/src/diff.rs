//! # Manifest Differ
//!
//! Compares a freshly built manifest against the approved baseline and
//! sorts every difference into exactly one of three classes.
//!
//! ## Change Classes
//!
//! | Class | Condition | Typical cause |
//! |-------|-----------|---------------|
//! | added | in current, not in baseline | dropped web shell, new deploy file |
//! | modified | in both, hashes differ | patched bootstrap, injected code |
//! | deleted | in baseline, not in current | removed guard, vanished file |
//!
//! ## Algorithm
//!
//! One pass over `current` finds additions and modifications; one pass over
//! `baseline` finds deletions. Both lookups are map probes, so the cost is
//! O(|current| + |baseline|). Paths are compared as stored: normalization
//! already happened when the manifests were built, never here.

use crate::models::{DiffReport, Manifest};

/// Diffs `current` against `baseline`.
///
/// # Example
///
/// ```rust
/// use sourceguard_manifest::{diff, Manifest};
///
/// let mut baseline = Manifest::new();
/// baseline.insert("app/boot.rs", [1u8; 32]).unwrap();
///
/// let mut current = Manifest::new();
/// current.insert("app/boot.rs", [2u8; 32]).unwrap();
///
/// let report = diff(&current, &baseline);
/// assert!(report.modified.contains("app/boot.rs"));
/// assert!(!report.is_clean());
/// ```
pub fn diff(current: &Manifest, baseline: &Manifest) -> DiffReport {
    let mut report = DiffReport::default();

    for (path, hash) in current.iter() {
        match baseline.get(path) {
            None => {
                report.added.insert(path.to_string());
            }
            Some(expected) if expected != hash => {
                report.modified.insert(path.to_string());
            }
            Some(_) => {}
        }
    }

    for path in baseline.paths() {
        if !current.contains(path) {
            report.deleted.insert(path.to_string());
        }
    }

    report
}
