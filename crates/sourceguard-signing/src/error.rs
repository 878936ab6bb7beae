//! Error types for key and signature handling.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for signing operations.
pub type Result<T> = std::result::Result<T, SigningError>;

/// Errors raised while generating, storing, or parsing key material.
///
/// Verification itself never returns an error: it returns a
/// [`SignatureStatus`](crate::SignatureStatus) so a failed check cannot be
/// mistaken for an operational hiccup and skipped.
#[derive(Debug, Error)]
pub enum SigningError {
    /// A key file could not be read or written.
    #[error("key storage I/O error at {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The requested key file does not exist.
    #[error("key file not found: {0}")]
    KeyNotFound(PathBuf),

    /// Key material did not decode to a valid Ed25519 key.
    #[error("malformed key: {0}")]
    MalformedKey(String),

    /// Signature bytes did not decode to a 64-byte Ed25519 signature.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),
}
