//! # Baseline Store
//!
//! Persists the approved manifest together with its signature so the two can
//! never be observed out of step.
//!
//! ## Layout
//!
//! ```text
//! <baseline_dir>/
//! ├── CURRENT              "gen-<uuid>\n"
//! ├── approve.lock         cross-process approval lock
//! └── gen-<uuid>/
//!     ├── manifest.json    manifest document (pretty JSON)
//!     └── manifest.sig     hex Ed25519 signature over the manifest digest
//! ```
//!
//! A new approval writes a fresh generation directory, then renames a new
//! `CURRENT` into place. The rename is the only step a reader can observe,
//! so a reader sees either the old pair or the new pair.
//!
//! Readers in other processes are not covered by any lock. A read re-checks
//! `CURRENT` after both files are in hand and starts over if it moved, and
//! pruning keeps the generation that was current before the swap so a
//! reader that just resolved the old pointer still finds its files.

use crate::error::GuardError;
use crate::Result;
use fs2::FileExt;
use sourceguard_manifest::{manifest_digest, Hash, Manifest};
use sourceguard_signing::ManifestSignature;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Pointer file naming the active generation.
pub const CURRENT_FILE: &str = "CURRENT";

/// Manifest file inside a generation.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Signature file inside a generation.
pub const SIGNATURE_FILE: &str = "manifest.sig";

/// Lock file serializing approvals across processes.
pub const LOCK_FILE: &str = "approve.lock";

const GENERATION_PREFIX: &str = "gen-";

/// Reads attempted before a racing approval is reported as an error.
const READ_ATTEMPTS: u32 = 5;

/// A loaded, parsed baseline.
#[derive(Debug, Clone)]
pub struct Baseline {
    /// Generation directory name.
    pub generation: String,

    /// The approved manifest.
    pub manifest: Manifest,

    /// Digest recomputed from `manifest`.
    pub digest: Hash,

    /// Stored signature, if one was present and well-formed.
    pub signature: Option<ManifestSignature>,

    /// True if a signature file existed but could not be parsed.
    pub signature_malformed: bool,
}

/// Baseline files as stored, before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBaseline {
    /// Generation directory name.
    pub generation: String,
    /// Contents of `manifest.json`.
    pub manifest_bytes: Vec<u8>,
    /// Contents of `manifest.sig`, if present.
    pub signature_bytes: Option<Vec<u8>>,
}

impl RawBaseline {
    /// Parses the manifest and signature.
    ///
    /// An unparsable manifest is corruption. An unparsable signature is not:
    /// it is recorded as malformed so verification reports it as a mismatch.
    pub fn parse(self) -> Result<Baseline> {
        let manifest = Manifest::from_json_slice(&self.manifest_bytes).map_err(|e| {
            GuardError::BaselineCorrupt(format!("{}/{}: {}", self.generation, MANIFEST_FILE, e))
        })?;
        let digest = manifest_digest(&manifest);

        let (signature, signature_malformed) = match self.signature_bytes.as_deref() {
            None => (None, false),
            Some(raw) => match ManifestSignature::parse(raw) {
                Ok(sig) => (Some(sig), false),
                Err(e) => {
                    warn!(generation = %self.generation, error = %e, "Stored signature is malformed");
                    (None, true)
                }
            },
        };

        Ok(Baseline {
            generation: self.generation,
            manifest,
            digest,
            signature,
            signature_malformed,
        })
    }
}

/// Filesystem-backed baseline store.
#[derive(Debug, Clone)]
pub struct BaselineStore {
    dir: PathBuf,
}

impl BaselineStore {
    /// A store rooted at `dir`. Nothing is created until the first persist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the `CURRENT` pointer.
    pub fn current_path(&self) -> PathBuf {
        self.dir.join(CURRENT_FILE)
    }

    /// Path of the approval lock file.
    pub fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE)
    }

    /// Directory of a generation.
    pub fn generation_dir(&self, generation: &str) -> PathBuf {
        self.dir.join(generation)
    }

    /// Returns true if a baseline pointer exists.
    pub fn exists(&self) -> bool {
        self.current_path().is_file()
    }

    /// Name of the active generation, or `None` before the first approval.
    pub fn current_generation(&self) -> Result<Option<String>> {
        let path = self.current_path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(GuardError::io(path, e)),
        };
        let generation = raw.trim();
        if !is_generation_name(generation) {
            return Err(GuardError::BaselineCorrupt(format!(
                "{} does not name a generation: {:?}",
                CURRENT_FILE, generation
            )));
        }
        Ok(Some(generation.to_string()))
    }

    /// Reads the active generation's files without parsing them.
    ///
    /// The pair returned was named by `CURRENT` both before and after it was
    /// read. Reads that lose a race with an approval are retried.
    pub fn load_raw(&self) -> Result<Option<RawBaseline>> {
        let mut attempt = 1;
        loop {
            match self.read_generation() {
                Ok(raw) => return Ok(raw),
                Err(e) if attempt < READ_ATTEMPTS => {
                    debug!(attempt, error = %e, "Baseline read failed, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Loads and parses the active baseline.
    pub fn load(&self) -> Result<Option<Baseline>> {
        self.load_raw()?.map(RawBaseline::parse).transpose()
    }

    fn read_generation(&self) -> Result<Option<RawBaseline>> {
        let generation = match self.current_generation()? {
            Some(generation) => generation,
            None => return Ok(None),
        };
        let gen_dir = self.generation_dir(&generation);

        let manifest_path = gen_dir.join(MANIFEST_FILE);
        let manifest_bytes = match fs::read(&manifest_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(GuardError::BaselineCorrupt(format!(
                    "{} is missing",
                    manifest_path.display()
                )))
            }
            Err(e) => return Err(GuardError::io(manifest_path, e)),
        };

        let signature_path = gen_dir.join(SIGNATURE_FILE);
        let signature_bytes = match fs::read(&signature_path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(GuardError::io(signature_path, e)),
        };

        let now = self.current_generation()?;
        if now.as_deref() != Some(generation.as_str()) {
            return Err(GuardError::BaselineCorrupt(format!(
                "{} moved from {} while it was being read",
                CURRENT_FILE, generation
            )));
        }

        Ok(Some(RawBaseline {
            generation,
            manifest_bytes,
            signature_bytes,
        }))
    }

    /// Atomically replaces the baseline with `manifest` and `signature`.
    ///
    /// Returns the new generation name. Callers must hold the approval lock.
    pub fn persist(&self, manifest: &Manifest, signature: &ManifestSignature) -> Result<String> {
        fs::create_dir_all(&self.dir).map_err(|e| GuardError::io(&self.dir, e))?;

        let generation = format!("{}{}", GENERATION_PREFIX, Uuid::new_v4().simple());
        let gen_dir = self.generation_dir(&generation);
        fs::create_dir(&gen_dir).map_err(|e| GuardError::io(&gen_dir, e))?;

        let manifest_json = manifest.to_json_pretty()?;
        write_synced(&gen_dir.join(MANIFEST_FILE), manifest_json.as_bytes())?;
        write_synced(
            &gen_dir.join(SIGNATURE_FILE),
            format!("{}\n", signature.to_hex()).as_bytes(),
        )?;
        sync_dir(&gen_dir)?;

        let previous = match self.current_generation() {
            Ok(previous) => previous,
            Err(e) => {
                warn!(error = %e, "Replacing unreadable baseline pointer");
                None
            }
        };

        let tmp = self.dir.join(format!("{}.tmp", CURRENT_FILE));
        write_synced(&tmp, format!("{}\n", generation).as_bytes())?;
        let current = self.current_path();
        fs::rename(&tmp, &current).map_err(|e| GuardError::io(&current, e))?;
        sync_dir(&self.dir)?;

        info!(generation = %generation, files = manifest.len(), "Baseline persisted");
        self.prune_generations(&generation, previous.as_deref());
        Ok(generation)
    }

    /// Removes every generation directory except `keep` and the one it
    /// replaced. Best effort.
    fn prune_generations(&self, keep: &str, previous: Option<&str>) {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Cannot list baseline store");
                return;
            }
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name == keep || previous == Some(&*name) || !is_generation_name(&name) {
                continue;
            }
            match fs::remove_dir_all(entry.path()) {
                Ok(()) => debug!(generation = %name, "Removed superseded generation"),
                Err(e) => warn!(generation = %name, error = %e, "Cannot remove superseded generation"),
            }
        }
    }

    /// Takes the cross-process approval lock without blocking.
    ///
    /// # Errors
    ///
    /// `GuardError::ApprovalInProgress` if another process holds it.
    pub fn try_lock(&self) -> Result<ApprovalLock> {
        fs::create_dir_all(&self.dir).map_err(|e| GuardError::io(&self.dir, e))?;
        let path = self.lock_path();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| GuardError::io(&path, e))?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => Ok(ApprovalLock { file, path }),
            Err(e) if is_contended(&e) => Err(GuardError::ApprovalInProgress),
            Err(e) => Err(GuardError::io(path, e)),
        }
    }
}

/// Held approval lock; released on drop.
#[derive(Debug)]
pub struct ApprovalLock {
    file: File,
    path: PathBuf,
}

impl Drop for ApprovalLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %e, "Failed to release approval lock");
        }
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

fn is_generation_name(name: &str) -> bool {
    name.strip_prefix(GENERATION_PREFIX)
        .is_some_and(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric()))
}

fn write_synced(path: &Path, contents: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| GuardError::io(path, e))?;
    file.write_all(contents).map_err(|e| GuardError::io(path, e))?;
    file.sync_all().map_err(|e| GuardError::io(path, e))
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| GuardError::io(dir, e))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
