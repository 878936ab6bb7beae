//! # Sourceguard Signing - Key & Signature Manager
//!
//! Ed25519 keys and signatures for approved manifest baselines. An attacker
//! who can edit files can also edit the manifest that lists their hashes;
//! they cannot produce a signature over the edited manifest without the
//! private key, which never leaves the host's protected key directory.
//!
//! ## What Is Signed
//!
//! The signature covers the 32-byte digest produced by
//! [`sourceguard_manifest::manifest_digest`], which is SHA-256 over a
//! domain prefix and the RFC 8785 canonical form of the manifest document.
//!
//! ## Failure Policy
//!
//! Verification is fail-closed. A missing key, a missing signature, a
//! malformed signature, or a mismatch are all "not verified"; there is no
//! state in which a check is skipped.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sourceguard_signing::{sign, verify, KeyStore, SignatureStatus};
//!
//! let store = KeyStore::new("/var/lib/sourceguard/keys");
//! let keys = store.generate_keypair().unwrap();
//!
//! let digest = [0u8; 32];
//! let signature = sign(&digest, keys.signing_key());
//! let public = store.load_verifying_key().ok();
//!
//! assert_eq!(
//!     verify(&digest, Some(&signature), public.as_ref()),
//!     SignatureStatus::Verified
//! );
//! ```
//!
//! ## References
//!
//! - **RFC 8032** - "Edwards-Curve Digital Signature Algorithm (EdDSA)"
//!   <https://www.rfc-editor.org/rfc/rfc8032>

mod error;
pub mod keys;
pub mod signature;

pub use ed25519_dalek::VerifyingKey;
pub use error::{Result, SigningError};
pub use keys::{parse_public_key, public_key_fingerprint, KeyPair, KeyStore};
pub use signature::{sign, verify, ManifestSignature, SignatureStatus};
