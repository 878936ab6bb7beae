//! Error types for Sourceguard Core.

use crate::audit::AuditError;
use sourceguard_manifest::ManifestError;
use sourceguard_signing::SigningError;
use std::path::PathBuf;
use thiserror::Error;

/// Core error type for orchestrator operations.
///
/// The request gate never surfaces this type; it collapses every failure
/// into `false`.
#[derive(Debug, Error)]
pub enum GuardError {
    /// A mutating operation was invoked without elevated privilege.
    #[error("Not authorized to {operation}")]
    Unauthorized {
        /// The refused operation.
        operation: String,
    },

    /// Another approval or key rotation holds the baseline lock.
    #[error("Another approval is already in progress")]
    ApprovalInProgress,

    /// No approved baseline exists.
    #[error("No approved baseline")]
    NoBaseline,

    /// The baseline store is present but unreadable or inconsistent.
    #[error("Baseline corrupt: {0}")]
    BaselineCorrupt(String),

    /// The private key does not match the public key the gate trusts.
    #[error("Signing key {signing} does not match trusted key {trusted}")]
    KeyMismatch {
        /// Fingerprint of the stored signing key.
        signing: String,
        /// Fingerprint of the trusted public key.
        trusted: String,
    },

    /// Filesystem error outside the manifest walk.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Manifest error passthrough.
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Signing error passthrough.
    #[error("Signing error: {0}")]
    Signing(#[from] SigningError),

    /// Audit sink error passthrough.
    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GuardError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GuardError::Io {
            path: path.into(),
            source,
        }
    }
}
