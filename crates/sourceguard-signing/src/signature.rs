//! Signing and verification of manifest digests.
//!
//! Verification returns a three-way [`SignatureStatus`] instead of a
//! `Result`. Every caller has to match on it, and only `Verified` means
//! the baseline can be trusted.

use crate::error::{Result, SigningError};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey, SIGNATURE_LENGTH};
use serde::{Deserialize, Serialize};
use sourceguard_manifest::Hash;
use std::fmt;

/// Outcome of checking a baseline signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureStatus {
    /// The signature is valid for this digest under this key.
    Verified,

    /// A signature and key were present but they do not match the digest.
    Mismatched,

    /// The signature or the public key is absent or unreadable.
    Missing,
}

impl SignatureStatus {
    /// Returns true only for [`SignatureStatus::Verified`].
    pub fn is_verified(self) -> bool {
        matches!(self, SignatureStatus::Verified)
    }
}

impl fmt::Display for SignatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verified => write!(f, "verified"),
            Self::Mismatched => write!(f, "mismatched"),
            Self::Missing => write!(f, "missing"),
        }
    }
}

/// An Ed25519 signature over a manifest digest.
#[derive(Clone, PartialEq, Eq)]
pub struct ManifestSignature(Signature);

impl ManifestSignature {
    /// Wraps raw signature bytes.
    pub fn from_bytes(bytes: &[u8; SIGNATURE_LENGTH]) -> Self {
        Self(Signature::from_bytes(bytes))
    }

    /// Raw signature bytes.
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
        self.0.to_bytes()
    }

    /// Lowercase hex, the on-disk form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Parses a signature file body.
    ///
    /// Accepts either exactly 64 raw bytes or hex text (surrounding
    /// whitespace ignored).
    ///
    /// # Errors
    ///
    /// `SigningError::MalformedSignature` if neither form decodes to 64 bytes.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.len() == SIGNATURE_LENGTH {
            if let Ok(bytes) = <[u8; SIGNATURE_LENGTH]>::try_from(raw) {
                if std::str::from_utf8(raw).map_or(true, |s| !is_hex(s.trim())) {
                    return Ok(Self::from_bytes(&bytes));
                }
            }
        }

        let text = std::str::from_utf8(raw)
            .map_err(|_| {
                SigningError::MalformedSignature("not UTF-8 hex or 64 raw bytes".to_string())
            })?
            .trim();
        if text.is_empty() {
            return Err(SigningError::MalformedSignature("empty".to_string()));
        }
        let decoded = hex::decode(text)
            .map_err(|e| SigningError::MalformedSignature(format!("invalid hex: {}", e)))?;
        let bytes: [u8; SIGNATURE_LENGTH] = decoded.try_into().map_err(|v: Vec<u8>| {
            SigningError::MalformedSignature(format!(
                "expected {} bytes, got {}",
                SIGNATURE_LENGTH,
                v.len()
            ))
        })?;
        Ok(Self::from_bytes(&bytes))
    }
}

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}

impl fmt::Debug for ManifestSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ManifestSignature({})", self.to_hex())
    }
}

/// Signs a manifest digest.
pub fn sign(digest: &Hash, key: &SigningKey) -> ManifestSignature {
    ManifestSignature(key.sign(digest))
}

/// Verifies a manifest digest.
///
/// `None` for either the signature or the key yields `Missing`. Uses strict
/// verification, which also rejects weak public keys and malleable
/// signatures.
///
/// # Example
///
/// ```rust
/// use sourceguard_signing::{sign, verify, KeyPair, SignatureStatus};
///
/// let keys = KeyPair::generate();
/// let digest = [7u8; 32];
/// let signature = sign(&digest, keys.signing_key());
///
/// let public = keys.verifying_key();
/// assert_eq!(verify(&digest, Some(&signature), Some(&public)), SignatureStatus::Verified);
/// assert_eq!(verify(&[8u8; 32], Some(&signature), Some(&public)), SignatureStatus::Mismatched);
/// assert_eq!(verify(&digest, None, Some(&public)), SignatureStatus::Missing);
/// ```
pub fn verify(
    digest: &Hash,
    signature: Option<&ManifestSignature>,
    key: Option<&VerifyingKey>,
) -> SignatureStatus {
    let (Some(signature), Some(key)) = (signature, key) else {
        return SignatureStatus::Missing;
    };
    match key.verify_strict(digest, &signature.0) {
        Ok(()) => SignatureStatus::Verified,
        Err(_) => SignatureStatus::Mismatched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[11u8; 32])
    }

    #[test]
    fn test_sign_verify() {
        let key = signing_key();
        let digest = [1u8; 32];
        let signature = sign(&digest, &key);
        assert_eq!(
            verify(&digest, Some(&signature), Some(&key.verifying_key())),
            SignatureStatus::Verified
        );
    }

    #[test]
    fn test_wrong_key_mismatches() {
        let digest = [1u8; 32];
        let signature = sign(&digest, &signing_key());
        let other = SigningKey::from_bytes(&[12u8; 32]).verifying_key();
        assert_eq!(
            verify(&digest, Some(&signature), Some(&other)),
            SignatureStatus::Mismatched
        );
    }

    #[test]
    fn test_missing_key() {
        let digest = [1u8; 32];
        let signature = sign(&digest, &signing_key());
        assert_eq!(verify(&digest, Some(&signature), None), SignatureStatus::Missing);
        assert!(!SignatureStatus::Missing.is_verified());
    }

    #[test]
    fn test_flipped_bit_mismatches() {
        let key = signing_key();
        let digest = [1u8; 32];
        let mut bytes = sign(&digest, &key).to_bytes();
        bytes[10] ^= 0x01;
        let tampered = ManifestSignature::from_bytes(&bytes);
        assert_eq!(
            verify(&digest, Some(&tampered), Some(&key.verifying_key())),
            SignatureStatus::Mismatched
        );
    }

    #[test]
    fn test_parse_hex_and_raw() {
        let signature = sign(&[3u8; 32], &signing_key());

        let from_hex = ManifestSignature::parse(format!("{}\n", signature.to_hex()).as_bytes());
        assert_eq!(from_hex.unwrap(), signature);

        let from_raw = ManifestSignature::parse(&signature.to_bytes());
        assert_eq!(from_raw.unwrap(), signature);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(ManifestSignature::parse(b"").is_err());
        assert!(ManifestSignature::parse(b"   \n").is_err());
        assert!(ManifestSignature::parse(b"not-hex").is_err());
        assert!(ManifestSignature::parse(b"abcd").is_err());
        assert!(ManifestSignature::parse(&[0xffu8; 63]).is_err());
    }
}
