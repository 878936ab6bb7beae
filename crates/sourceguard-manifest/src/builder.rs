//! # Manifest Builder
//!
//! Walks every watched root, applies the [`PathClassifier`], and hashes each
//! in-scope regular file with SHA-256.
//!
//! ## Walk Semantics
//!
//! - Symlinks are never followed and never tracked. Following them could
//!   loop or pull files from outside the deployment root into the manifest.
//! - Excluded directories are pruned during the walk, not filtered afterwards.
//! - A file that disappears between discovery and hashing is omitted. The
//!   next comparison reports it as deleted, which is the correct signal.
//! - Any other I/O failure aborts the build. A tree that cannot be read is
//!   never reported as clean.
//!
//! ## References
//!
//! - NIST FIPS 180-4 - Secure Hash Standard (SHA-256)

use crate::classify::PathClassifier;
use crate::models::{Hash, Manifest, ManifestError, Result};
use crate::path::normalize_relative;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const READ_BUFFER_SIZE: usize = 8192;

/// Streams a file through SHA-256.
///
/// # Errors
///
/// Returns the underlying `std::io::Error`; callers decide whether
/// `NotFound` is tolerable.
pub fn hash_file(path: &Path) -> std::io::Result<Hash> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; READ_BUFFER_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().into())
}

/// Hashes an in-memory byte slice.
pub fn hash_bytes(bytes: &[u8]) -> Hash {
    Sha256::digest(bytes).into()
}

/// Builds manifests for one scope.
///
/// # Example
///
/// ```rust,no_run
/// use sourceguard_manifest::{ManifestBuilder, PathClassifier, ScanScope};
///
/// let classifier = PathClassifier::new(&ScanScope::new("/srv/site")).unwrap();
/// let manifest = ManifestBuilder::new(classifier).build().unwrap();
/// println!("{} files tracked", manifest.len());
/// ```
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    classifier: PathClassifier,
}

impl ManifestBuilder {
    /// Creates a builder for the classifier's scope.
    pub fn new(classifier: PathClassifier) -> Self {
        Self { classifier }
    }

    /// The classifier in use.
    pub fn classifier(&self) -> &PathClassifier {
        &self.classifier
    }

    /// Walks the watched roots and hashes every in-scope file.
    ///
    /// # Errors
    ///
    /// `ManifestError::Io` for any filesystem failure other than a file
    /// vanishing mid-walk.
    pub fn build(&self) -> Result<Manifest> {
        let root = self.classifier.deployment_root();
        let mut manifest = Manifest::new();

        for watched in self.classifier.watched_roots() {
            let start = if watched.is_empty() {
                root.to_path_buf()
            } else {
                root.join(watched)
            };

            match std::fs::symlink_metadata(&start) {
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!("Watched root does not exist: {}", start.display());
                    continue;
                }
                Err(source) => return Err(ManifestError::Io { path: start, source }),
            }

            self.walk_root(root, &start, &mut manifest)?;
        }

        info!(
            "Built manifest of {} files under {}",
            manifest.len(),
            root.display()
        );
        Ok(manifest)
    }

    fn walk_root(&self, root: &Path, start: &Path, manifest: &mut Manifest) -> Result<()> {
        let walker = WalkDir::new(start)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 || !entry.file_type().is_dir() {
                    return true;
                }
                match normalize_relative(root, entry.path()) {
                    Ok(rel) => !self.classifier.prunes_dir(&rel),
                    Err(_) => false,
                }
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| start.to_path_buf());
                    match err.into_io_error() {
                        Some(io) if io.kind() == ErrorKind::NotFound => {
                            debug!("Entry vanished during walk: {}", path.display());
                            continue;
                        }
                        Some(source) => return Err(ManifestError::Io { path, source }),
                        None => {
                            // Only produced for symlink loops, which cannot
                            // occur with follow_links(false).
                            warn!("Skipping unwalkable entry: {}", path.display());
                            continue;
                        }
                    }
                }
            };

            if !entry.file_type().is_file() {
                if entry.file_type().is_symlink() {
                    debug!("Not following symlink: {}", entry.path().display());
                }
                continue;
            }

            let rel = match normalize_relative(root, entry.path()) {
                Ok(rel) => rel,
                Err(e) => {
                    warn!("Skipping untrackable path: {}", e);
                    continue;
                }
            };
            if !self.classifier.is_in_scope(&rel) {
                continue;
            }

            let hash = match hash_file(entry.path()) {
                Ok(hash) => hash,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!("File vanished before hashing: {}", rel);
                    continue;
                }
                Err(source) => {
                    return Err(ManifestError::Io {
                        path: entry.path().to_path_buf(),
                        source,
                    })
                }
            };

            manifest.insert(&rel, hash)?;
        }

        Ok(())
    }
}
