//! # Key Generation and Storage
//!
//! The signing key never leaves the deployment host. It lives in a key
//! directory that must not be served by the web tier; the public half may
//! additionally be embedded in deployment configuration, since it is not
//! secret.
//!
//! ## Layout
//!
//! ```text
//! <key_dir>/
//! ├── CURRENT                  "key-<id>\n"
//! └── key-<id>/                mode 0700
//!     ├── signing.key          hex Ed25519 seed (32 bytes), mode 0600
//!     ├── signing.pub          hex Ed25519 public key
//!     └── signing.pub.prev     previous public key, kept on rotation
//! ```
//!
//! Generating a new keypair invalidates every signature made with the old
//! one. The previous public key is retained so old baselines can still be
//! inspected, but the gate only trusts the current key.
//!
//! A keypair is written into a fresh generation directory and becomes
//! visible through one rename of `CURRENT`, so the private and public
//! halves on disk always belong together. The replaced generation keeps
//! its public key for readers that resolved the old pointer; its private
//! key is deleted.

use crate::error::{Result, SigningError};
use ed25519_dalek::{SigningKey, VerifyingKey, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File name of the private key.
pub const PRIVATE_KEY_FILE: &str = "signing.key";

/// File name of the public key.
pub const PUBLIC_KEY_FILE: &str = "signing.pub";

/// File name the outgoing public key is moved to on rotation.
pub const PREVIOUS_PUBLIC_KEY_FILE: &str = "signing.pub.prev";

/// Pointer naming the active key generation.
pub const CURRENT_KEY_FILE: &str = "CURRENT";

const GENERATION_PREFIX: &str = "key-";

const READ_ATTEMPTS: u32 = 5;

/// An Ed25519 keypair.
///
/// `Debug` prints only the public fingerprint.
#[derive(Clone)]
pub struct KeyPair {
    signing: SigningKey,
}

impl KeyPair {
    /// Generates a fresh keypair from the operating system RNG.
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(&mut OsRng),
        }
    }

    /// Rebuilds a keypair from its 32-byte seed.
    pub fn from_seed(seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self {
            signing: SigningKey::from_bytes(seed),
        }
    }

    /// The private half.
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing
    }

    /// The public half.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing.verifying_key()
    }

    /// Hex encoding of the public key.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.verifying_key().to_bytes())
    }

    /// Short identifier of the public key for logs.
    pub fn fingerprint(&self) -> String {
        public_key_fingerprint(&self.verifying_key())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

/// First 8 bytes of SHA-256 over the public key, hex encoded.
pub fn public_key_fingerprint(key: &VerifyingKey) -> String {
    let digest = Sha256::digest(key.to_bytes());
    hex::encode(&digest[..8])
}

/// Parses a hex-encoded Ed25519 public key.
///
/// # Errors
///
/// `SigningError::MalformedKey` if the text is not 64 hex characters or
/// does not encode a valid curve point.
pub fn parse_public_key(raw: &str) -> Result<VerifyingKey> {
    let bytes = hex::decode(raw.trim())
        .map_err(|e| SigningError::MalformedKey(format!("public key is not hex: {}", e)))?;
    let bytes: [u8; PUBLIC_KEY_LENGTH] = bytes.try_into().map_err(|v: Vec<u8>| {
        SigningError::MalformedKey(format!(
            "public key must be {} bytes, got {}",
            PUBLIC_KEY_LENGTH,
            v.len()
        ))
    })?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|_| SigningError::MalformedKey("invalid Ed25519 public key".to_string()))
}

fn parse_seed(raw: &str) -> Result<[u8; SECRET_KEY_LENGTH]> {
    let bytes = hex::decode(raw.trim())
        .map_err(|_| SigningError::MalformedKey("private key is not hex".to_string()))?;
    bytes.try_into().map_err(|_| {
        SigningError::MalformedKey(format!("private key must be {} bytes", SECRET_KEY_LENGTH))
    })
}

/// Directory-backed key storage.
#[derive(Debug, Clone)]
pub struct KeyStore {
    dir: PathBuf,
}

impl KeyStore {
    /// Opens a key store rooted at `dir`. Nothing is created until a
    /// keypair is generated or stored.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The key directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the `CURRENT` pointer.
    pub fn pointer_path(&self) -> PathBuf {
        self.dir.join(CURRENT_KEY_FILE)
    }

    /// Directory of a key generation.
    pub fn generation_dir(&self, generation: &str) -> PathBuf {
        self.dir.join(generation)
    }

    /// Name of the active key generation, or `None` before the first keypair.
    pub fn current_generation(&self) -> Result<Option<String>> {
        let path = self.pointer_path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(SigningError::Io { path, source }),
        };
        let generation = raw.trim();
        if !is_generation_name(generation) {
            return Err(SigningError::MalformedKey(format!(
                "{} does not name a key generation: {:?}",
                CURRENT_KEY_FILE, generation
            )));
        }
        Ok(Some(generation.to_string()))
    }

    /// Path of the active private key file.
    pub fn private_key_path(&self) -> Result<Option<PathBuf>> {
        self.current_file(PRIVATE_KEY_FILE)
    }

    /// Path of the active public key file.
    pub fn public_key_path(&self) -> Result<Option<PathBuf>> {
        self.current_file(PUBLIC_KEY_FILE)
    }

    fn current_file(&self, file: &str) -> Result<Option<PathBuf>> {
        Ok(self
            .current_generation()?
            .map(|generation| self.generation_dir(&generation).join(file)))
    }

    /// Returns true if the active generation holds both key files.
    pub fn has_keypair(&self) -> bool {
        match self.current_generation() {
            Ok(Some(generation)) => {
                let dir = self.generation_dir(&generation);
                dir.join(PRIVATE_KEY_FILE).is_file() && dir.join(PUBLIC_KEY_FILE).is_file()
            }
            _ => false,
        }
    }

    /// Generates and stores a new keypair, replacing any existing one.
    pub fn generate_keypair(&self) -> Result<KeyPair> {
        let keys = KeyPair::generate();
        self.store(&keys)?;
        Ok(keys)
    }

    /// Persists a keypair as a new generation, retaining the outgoing
    /// public key.
    pub fn store(&self, keys: &KeyPair) -> Result<()> {
        create_dir(&self.dir, false)?;

        let previous = match self.current_generation() {
            Ok(previous) => previous,
            Err(e) => {
                warn!(error = %e, "Replacing unreadable key pointer");
                None
            }
        };
        let outgoing = previous.as_ref().and_then(|generation| {
            fs::read_to_string(self.generation_dir(generation).join(PUBLIC_KEY_FILE)).ok()
        });

        let generation = format!("{}{:016x}", GENERATION_PREFIX, OsRng.next_u64());
        let gen_dir = self.generation_dir(&generation);
        create_dir(&gen_dir, true)?;

        let seed = hex::encode(keys.signing_key().to_bytes());
        write_synced(&gen_dir.join(PRIVATE_KEY_FILE), seed.as_bytes(), true)?;
        write_synced(&gen_dir.join(PUBLIC_KEY_FILE), keys.public_key_hex().as_bytes(), false)?;
        if let Some(outgoing) = &outgoing {
            warn!("Replacing signing key; signatures made with the previous key will no longer verify");
            write_synced(&gen_dir.join(PREVIOUS_PUBLIC_KEY_FILE), outgoing.as_bytes(), false)?;
        }
        sync_dir(&gen_dir)?;

        let tmp = self.dir.join(format!(".{}.tmp", CURRENT_KEY_FILE));
        write_synced(&tmp, format!("{}\n", generation).as_bytes(), false)?;
        let pointer = self.pointer_path();
        fs::rename(&tmp, &pointer).map_err(|source| SigningError::Io {
            path: pointer.clone(),
            source,
        })?;
        sync_dir(&self.dir)?;

        info!(
            "Stored signing keypair {} in {}",
            keys.fingerprint(),
            gen_dir.display()
        );
        self.prune_generations(&generation, previous.as_deref());
        Ok(())
    }

    /// Removes generations other than `keep` and `previous`, and the private
    /// key of `previous`. Best effort.
    fn prune_generations(&self, keep: &str, previous: Option<&str>) {
        if let Some(previous) = previous {
            let retired = self.generation_dir(previous).join(PRIVATE_KEY_FILE);
            if let Err(e) = fs::remove_file(&retired) {
                if e.kind() != ErrorKind::NotFound {
                    warn!(path = %retired.display(), error = %e, "Cannot remove retired private key");
                }
            }
        }

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Cannot list key directory");
                return;
            }
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name == keep || previous == Some(&*name) || !is_generation_name(&name) {
                continue;
            }
            if let Err(e) = fs::remove_dir_all(entry.path()) {
                warn!(generation = %name, error = %e, "Cannot remove superseded key generation");
            }
        }
    }

    /// Loads the private key.
    ///
    /// # Errors
    ///
    /// `KeyNotFound` if no keypair is stored, `MalformedKey` if it does not
    /// decode.
    pub fn load_keypair(&self) -> Result<KeyPair> {
        let raw = self.read_current(PRIVATE_KEY_FILE)?;
        Ok(KeyPair::from_seed(&parse_seed(&raw)?))
    }

    /// Loads the public key.
    pub fn load_verifying_key(&self) -> Result<VerifyingKey> {
        parse_public_key(&self.read_current(PUBLIC_KEY_FILE)?)
    }

    /// Loads the retained previous public key, if one exists.
    pub fn load_previous_verifying_key(&self) -> Result<Option<VerifyingKey>> {
        match self.read_current(PREVIOUS_PUBLIC_KEY_FILE) {
            Ok(raw) => parse_public_key(&raw).map(Some),
            Err(SigningError::KeyNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Reads `file` from the active generation. A read that loses a race
    /// with a rotation in another process is retried.
    fn read_current(&self, file: &str) -> Result<String> {
        let mut attempt = 1;
        loop {
            let generation = self
                .current_generation()?
                .ok_or_else(|| SigningError::KeyNotFound(self.pointer_path()))?;
            match read_key_file(&self.generation_dir(&generation).join(file)) {
                Err(SigningError::KeyNotFound(_))
                    if attempt < READ_ATTEMPTS
                        && self.current_generation()?.as_deref() != Some(generation.as_str()) =>
                {
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

fn is_generation_name(name: &str) -> bool {
    name.strip_prefix(GENERATION_PREFIX)
        .is_some_and(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_hexdigit()))
}

fn read_key_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            SigningError::KeyNotFound(path.to_path_buf())
        } else {
            SigningError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

fn create_dir(dir: &Path, private: bool) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        if private {
            builder.mode(0o700);
        }
    }
    #[cfg(not(unix))]
    let _ = private;

    builder.create(dir).map_err(|source| SigningError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

fn write_synced(path: &Path, contents: &[u8], private: bool) -> Result<()> {
    let io_err = |source| SigningError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(if private { 0o600 } else { 0o644 });
    }
    #[cfg(not(unix))]
    let _ = private;

    let mut file = options.open(path).map_err(io_err)?;
    file.write_all(contents).map_err(io_err)?;
    file.sync_all().map_err(io_err)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    fs::File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|source| SigningError::Io {
            path: dir.to_path_buf(),
            source,
        })
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
