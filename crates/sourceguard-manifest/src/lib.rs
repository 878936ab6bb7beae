//! # Sourceguard Manifest - Content-Addressed Tree Snapshots
//!
//! The manifest crate turns a deployed code tree into a deterministic
//! path → SHA-256 mapping and compares two such mappings. It is the
//! foundation the signing gate builds on: if the manifest is wrong, no
//! signature can make it right.
//!
//! ## Purpose
//!
//! 1. **Path Classification** - Decide which files are tracked (watched
//!    roots minus exclusion rules).
//!
//! 2. **Manifest Building** - Walk the tree without following symlinks and
//!    hash every tracked file.
//!
//! 3. **Manifest Diffing** - Split differences into added, modified, and
//!    deleted paths.
//!
//! 4. **Canonical Digest** - Derive the single 32-byte value a baseline
//!    signature covers.
//!
//! ## Threat Model
//!
//! | Threat | Description | Defense |
//! |--------|-------------|---------|
//! | Code injection | New file dropped into the tree | `added` set |
//! | Backdoored file | Existing file edited in place | `modified` set |
//! | Guard removal | Security file deleted | `deleted` set |
//! | Path aliasing | Same file under two spellings | Normalization at the edge |
//! | Scope escape | Symlink pointing outside the root | Symlinks never followed |
//! | Hash collision | Crafted file with same hash | SHA-256 collision resistance |
//!
//! ## Architecture
//!
//! ```text
//!   watched roots
//!        │
//!        ▼
//!  ┌──────────────┐   in scope?   ┌──────────────┐
//!  │   WalkDir    │──────────────▶│  Classifier  │
//!  └──────┬───────┘               └──────────────┘
//!         │ regular files
//!         ▼
//!  ┌──────────────┐               ┌──────────────┐
//!  │   SHA-256    │──────────────▶│   Manifest   │──▶ diff() ──▶ DiffReport
//!  └──────────────┘               └──────┬───────┘
//!                                        │
//!                                        ▼
//!                               manifest_digest() ──▶ signed by the core
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sourceguard_manifest::{diff, ManifestBuilder, PathClassifier, ScanScope};
//!
//! let classifier = PathClassifier::new(&ScanScope::new("/srv/site")).unwrap();
//! let builder = ManifestBuilder::new(classifier);
//!
//! let baseline = builder.build().unwrap();
//! // ... time passes, files change ...
//! let current = builder.build().unwrap();
//!
//! let report = diff(&current, &baseline);
//! if !report.is_clean() {
//!     println!("Tree changed: {}", report.summary());
//! }
//! ```
//!
//! ## References
//!
//! - **NIST FIPS 180-4** - "Secure Hash Standard (SHS)" - SHA-256 specification.
//!   <https://csrc.nist.gov/publications/detail/fips/180/4/final>
//! - **RFC 8785 (2020)** - "JSON Canonicalization Scheme (JCS)"
//!   <https://www.rfc-editor.org/rfc/rfc8785>

pub mod builder;
pub mod canonicalize;
pub mod classify;
pub mod diff;
pub mod models;
pub mod path;

pub use builder::{hash_bytes, hash_file, ManifestBuilder};
pub use canonicalize::manifest_digest;
pub use classify::{ExclusionRule, PathClassifier, ScanScope, DEFAULT_EXCLUDES};
pub use diff::diff;
pub use models::{
    hash_from_hex, hash_to_hex, DiffReport, DiffStatus, Hash, Manifest, ManifestDocument,
    ManifestEntry, ManifestError, Result, HASH_SIZE,
};
