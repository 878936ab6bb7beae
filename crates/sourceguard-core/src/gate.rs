//! Fast Gate Verifier and the request-gate adapter.
//!
//! [`gate_check`] re-hashes only the configured critical files against an
//! already-verified baseline. It never walks the tree, so it is cheap enough
//! to run on every request. Whole-tree coverage comes from
//! [`IntegrityOrchestrator::verify`](crate::IntegrityOrchestrator::verify).

use crate::context::RequestContext;
use crate::orchestrator::IntegrityOrchestrator;
use crate::verdict::{GateFailure, GateVerdict};
use sourceguard_manifest::{hash_file, hash_to_hex, Manifest};
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// HTTP status returned when the gate refuses a request.
pub const FORBIDDEN_STATUS: u16 = 403;

/// Body returned when the gate refuses a request. Carries no diagnostics.
pub const FORBIDDEN_BODY: &str = "403 Forbidden";

/// Checks each critical path against `baseline`, in order.
///
/// A path fails if it has no baseline entry, is missing on disk, is not a
/// regular file, cannot be read, or hashes differently. The first failure is
/// returned. An empty `critical_paths` fails.
pub fn gate_check(root: &Path, baseline: &Manifest, critical_paths: &[String]) -> GateVerdict {
    if critical_paths.is_empty() {
        return GateVerdict::fail(GateFailure::NoCriticalPaths);
    }

    for rel in critical_paths {
        if let Some(reason) = check_path(root, baseline, rel) {
            debug!(path = %rel, reason = %reason, "Critical file failed");
            return GateVerdict::fail(reason);
        }
    }
    GateVerdict::Pass
}

fn check_path(root: &Path, baseline: &Manifest, rel: &str) -> Option<GateFailure> {
    let Some(expected) = baseline.get(rel) else {
        return Some(GateFailure::NotInBaseline {
            path: rel.to_string(),
        });
    };

    let abs = root.join(rel);
    let metadata = match std::fs::symlink_metadata(&abs) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Some(GateFailure::MissingOnDisk {
                path: rel.to_string(),
            })
        }
        Err(e) => {
            return Some(GateFailure::Unreadable {
                path: rel.to_string(),
                detail: e.to_string(),
            })
        }
    };
    if !metadata.file_type().is_file() {
        return Some(GateFailure::NotRegularFile {
            path: rel.to_string(),
        });
    }

    let actual = match hash_file(&abs) {
        Ok(hash) => hash,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Some(GateFailure::MissingOnDisk {
                path: rel.to_string(),
            })
        }
        Err(e) => {
            return Some(GateFailure::Unreadable {
                path: rel.to_string(),
                detail: e.to_string(),
            })
        }
    };

    if &actual != expected {
        return Some(GateFailure::HashMismatch {
            path: rel.to_string(),
            expected: hash_to_hex(expected),
            actual: hash_to_hex(&actual),
        });
    }
    None
}

/// What the request pipeline should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateResponse {
    /// Hand the request to the application.
    Continue,

    /// Short-circuit with a generic refusal.
    Forbidden {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: &'static str,
    },
}

impl GateResponse {
    /// The generic refusal.
    pub fn forbidden() -> Self {
        Self::Forbidden {
            status: FORBIDDEN_STATUS,
            body: FORBIDDEN_BODY,
        }
    }

    /// Returns true if the request may proceed.
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }
}

/// Request-pipeline adapter that consults the orchestrator before any
/// application code runs.
#[derive(Debug, Clone)]
pub struct RequestGate {
    orchestrator: Arc<IntegrityOrchestrator>,
}

impl RequestGate {
    /// Wraps a shared orchestrator.
    pub fn new(orchestrator: Arc<IntegrityOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Decides whether `request` may proceed.
    pub fn check(&self, request: &RequestContext) -> GateResponse {
        if self.orchestrator.validate_source_integrity(request) {
            GateResponse::Continue
        } else {
            GateResponse::forbidden()
        }
    }
}
