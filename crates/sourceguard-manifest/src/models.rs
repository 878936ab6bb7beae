//! # Core Data Models for the Manifest Builder
//!
//! This module defines the fundamental types used throughout the manifest
//! crate. Each type is designed with integrity as the primary concern: a
//! manifest is the trusted description of the deployed code tree, and every
//! invariant it carries is checked at construction rather than assumed.
//!
//! ## Threat Model
//!
//! The types in this module help defend against:
//!
//! - **Type Confusion**: `Hash` is a fixed 32-byte array, never a free-form string.
//! - **Path Aliasing**: `Manifest` keys are normalized relative paths; two
//!   spellings of the same file cannot both appear.
//! - **Incomplete Comparisons**: `DiffReport` exposes three disjoint sets and a
//!   single verdict so callers cannot check only one class of change.
//!
//! ## References
//!
//! - NIST FIPS 180-4 for hash size (SHA-256 = 32 bytes)

use crate::path::normalize_rel_str;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use thiserror::Error;

/// SHA-256 hash output size in bytes.
///
/// Derived from NIST FIPS 180-4, which specifies that SHA-256 produces a
/// 256-bit (32-byte) digest.
pub const HASH_SIZE: usize = 32;

/// A 32-byte SHA-256 hash value.
pub type Hash = [u8; HASH_SIZE];

/// Manifest document format version.
pub const MANIFEST_VERSION: u32 = 1;

/// Content hash algorithm recorded in every manifest document.
pub const HASH_ALGORITHM: &str = "sha256";

/// Encodes a hash as lowercase hex.
pub fn hash_to_hex(hash: &Hash) -> String {
    hex::encode(hash)
}

/// Decodes a 64-character hex string into a hash.
///
/// Upper-case digits are accepted; surrounding whitespace is not.
pub fn hash_from_hex(raw: &str) -> Result<Hash> {
    let bytes = hex::decode(raw).map_err(|_| ManifestError::InvalidHash(raw.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| ManifestError::InvalidHash(raw.to_string()))
}

/// A single tracked file: its normalized relative path and content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Forward-slash path relative to the deployment root.
    pub relative_path: String,

    /// SHA-256 of the file contents.
    pub content_hash: Hash,
}

/// A path → content hash mapping of the in-scope files of a tree.
///
/// Keys are normalized relative paths (see [`crate::path`]). The mapping is
/// backed by a `BTreeMap` so iteration order, and therefore the canonical
/// encoding, is deterministic.
///
/// # Invariants
///
/// - No two entries share a path.
/// - Every key is a normalized relative path (no `.`/`..`, no leading `/`).
///
/// # Example
///
/// ```rust
/// use sourceguard_manifest::Manifest;
///
/// let mut manifest = Manifest::new();
/// manifest.insert("app/boot.rs", [1u8; 32]).unwrap();
///
/// assert_eq!(manifest.len(), 1);
/// assert_eq!(manifest.get("app/boot.rs"), Some(&[1u8; 32]));
/// assert!(manifest.insert("app/boot.rs", [2u8; 32]).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: BTreeMap<String, Hash>,
}

impl Manifest {
    /// Creates an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry.
    ///
    /// The path must already be normalized. Inserting a path twice is an
    /// error, never a silent overwrite.
    ///
    /// # Errors
    ///
    /// - `ManifestError::InvalidPath` if `path` is not in normalized form.
    /// - `ManifestError::DuplicatePath` if `path` is already present.
    pub fn insert(&mut self, path: &str, hash: Hash) -> Result<()> {
        let normalized = normalize_rel_str(path)?;
        if normalized != path {
            return Err(ManifestError::InvalidPath(format!(
                "'{}' is not normalized (expected '{}')",
                path, normalized
            )));
        }
        if self.entries.contains_key(path) {
            return Err(ManifestError::DuplicatePath(path.to_string()));
        }
        self.entries.insert(path.to_string(), hash);
        Ok(())
    }

    /// Looks up the hash recorded for a normalized path.
    pub fn get(&self, path: &str) -> Option<&Hash> {
        self.entries.get(path)
    }

    /// Returns true if the path is tracked.
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of tracked files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no files are tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Hash)> {
        self.entries.iter().map(|(path, hash)| (path.as_str(), hash))
    }

    /// Iterates tracked paths in order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns the entries as owned [`ManifestEntry`] values.
    pub fn entries(&self) -> Vec<ManifestEntry> {
        self.entries
            .iter()
            .map(|(path, hash)| ManifestEntry {
                relative_path: path.clone(),
                content_hash: *hash,
            })
            .collect()
    }

    /// Converts the manifest into its persisted document form.
    pub fn to_document(&self) -> ManifestDocument {
        ManifestDocument {
            version: MANIFEST_VERSION,
            algorithm: HASH_ALGORITHM.to_string(),
            entries: self
                .entries
                .iter()
                .map(|(path, hash)| (path.clone(), hash_to_hex(hash)))
                .collect(),
        }
    }

    /// Rebuilds a manifest from a persisted document, re-validating every
    /// path and hash.
    ///
    /// # Errors
    ///
    /// - `ManifestError::UnsupportedFormat` for an unknown version or algorithm.
    /// - `ManifestError::InvalidPath` / `InvalidHash` for malformed entries.
    pub fn from_document(document: ManifestDocument) -> Result<Self> {
        if document.version != MANIFEST_VERSION || document.algorithm != HASH_ALGORITHM {
            return Err(ManifestError::UnsupportedFormat {
                version: document.version,
                algorithm: document.algorithm,
            });
        }

        let mut manifest = Manifest::new();
        for (path, hex_hash) in document.entries {
            manifest.insert(&path, hash_from_hex(&hex_hash)?)?;
        }
        Ok(manifest)
    }

    /// Parses a manifest from JSON bytes.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let document: ManifestDocument = serde_json::from_slice(bytes)?;
        Self::from_document(document)
    }

    /// Serializes the manifest document as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }
}

/// On-disk representation of a manifest.
///
/// Hashes are hex-encoded so the file is reviewable by operators. This is
/// also the exact structure that is canonicalized and digested for signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestDocument {
    /// Document format version.
    pub version: u32,

    /// Content hash algorithm name.
    pub algorithm: String,

    /// Normalized relative path → hex SHA-256.
    pub entries: BTreeMap<String, String>,
}

/// Overall verdict of a manifest comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStatus {
    /// No additions, modifications, or deletions.
    Clean,

    /// At least one path differs from the baseline.
    Compromised,
}

/// Result of comparing a freshly built manifest against a baseline.
///
/// # Invariants
///
/// - `added`, `modified`, and `deleted` are pairwise disjoint.
/// - [`DiffReport::status`] is `Clean` iff all three sets are empty.
///
/// Sets are ordered so JSON output and log lines are stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffReport {
    /// Paths present in the current tree but not in the baseline.
    pub added: BTreeSet<String>,

    /// Paths present in both with different content hashes.
    pub modified: BTreeSet<String>,

    /// Paths present in the baseline but missing from the current tree.
    pub deleted: BTreeSet<String>,
}

impl DiffReport {
    /// Returns true if no change of any class was found.
    pub fn is_clean(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// The overall verdict.
    pub fn status(&self) -> DiffStatus {
        if self.is_clean() {
            DiffStatus::Clean
        } else {
            DiffStatus::Compromised
        }
    }

    /// Total number of changed paths across all three classes.
    pub fn change_count(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len()
    }

    /// One-line summary suitable for logs and audit descriptions.
    pub fn summary(&self) -> String {
        format!(
            "{} added, {} modified, {} deleted",
            self.added.len(),
            self.modified.len(),
            self.deleted.len()
        )
    }
}

/// Errors that can occur while building, loading, or comparing manifests.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// A filesystem operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A path could not be normalized or escapes the deployment root.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A hash was not 64 hex characters.
    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    /// The same path appeared twice.
    #[error("Duplicate manifest path: {0}")]
    DuplicatePath(String),

    /// Manifest document version or algorithm is not supported.
    #[error("Unsupported manifest format: version {version}, algorithm {algorithm}")]
    UnsupportedFormat {
        /// Version found in the document.
        version: u32,
        /// Algorithm found in the document.
        algorithm: String,
    },

    /// An exclusion glob failed to compile.
    #[error("Invalid exclusion pattern '{pattern}': {source}")]
    Pattern {
        /// The offending pattern.
        pattern: String,
        /// Underlying error.
        #[source]
        source: globset::Error,
    },

    /// Failed to serialize or deserialize a manifest document.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for manifest operations.
pub type Result<T> = std::result::Result<T, ManifestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_rejects_unnormalized() {
        let mut manifest = Manifest::new();
        assert!(matches!(
            manifest.insert("./app/boot.rs", [0u8; 32]),
            Err(ManifestError::InvalidPath(_))
        ));
        assert!(matches!(
            manifest.insert("app\\boot.rs", [0u8; 32]),
            Err(ManifestError::InvalidPath(_))
        ));
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_insert_rejects_duplicate() {
        let mut manifest = Manifest::new();
        manifest.insert("index.php", [1u8; 32]).unwrap();
        assert!(matches!(
            manifest.insert("index.php", [1u8; 32]),
            Err(ManifestError::DuplicatePath(_))
        ));
    }

    #[test]
    fn test_document_roundtrip_revalidates() {
        let mut manifest = Manifest::new();
        manifest.insert("a/b.txt", [0xab; 32]).unwrap();

        let json = manifest.to_json_pretty().unwrap();
        let parsed = Manifest::from_json_slice(json.as_bytes()).unwrap();
        assert_eq!(parsed, manifest);

        let tampered = json.replace("a/b.txt", "a/../b.txt");
        assert!(Manifest::from_json_slice(tampered.as_bytes()).is_err());
    }

    #[test]
    fn test_from_document_rejects_unknown_algorithm() {
        let document = ManifestDocument {
            version: MANIFEST_VERSION,
            algorithm: "md5".to_string(),
            entries: BTreeMap::new(),
        };
        assert!(matches!(
            Manifest::from_document(document),
            Err(ManifestError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_hash_hex() {
        let hash = [0x0fu8; 32];
        let encoded = hash_to_hex(&hash);
        assert_eq!(encoded.len(), 64);
        assert_eq!(hash_from_hex(&encoded).unwrap(), hash);
        assert!(hash_from_hex("abcd").is_err());
        assert!(hash_from_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn test_diff_report_status() {
        let mut report = DiffReport::default();
        assert!(report.is_clean());
        assert_eq!(report.status(), DiffStatus::Clean);

        report.deleted.insert("gone.rs".to_string());
        assert_eq!(report.status(), DiffStatus::Compromised);
        assert_eq!(report.change_count(), 1);
        assert_eq!(report.summary(), "0 added, 0 modified, 1 deleted");
    }
}
