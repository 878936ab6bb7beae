//! # Canonical Manifest Encoding and Digest
//!
//! The signature over a baseline does not cover the manifest file bytes as
//! written to disk. It covers a summary digest derived from the parsed
//! mapping:
//!
//! ```text
//! digest = SHA-256( DIGEST_DOMAIN || canonical_json(document) )
//! ```
//!
//! where `document` is the [`ManifestDocument`] form
//! (`{"algorithm":"sha256","entries":{...},"version":1}`) and
//! `canonical_json` follows RFC 8785 (JSON Canonicalization Scheme).
//!
//! Because the digest is recomputed from the parsed manifest on every
//! verification, whitespace or key-order edits to the file cannot change what
//! is verified, and any edit that changes a path or a hash changes the digest.
//! The domain prefix keeps a manifest signature from being replayed as a
//! signature over any other 32-byte value signed with the same key.
//!
//! ## RFC 8785 Summary
//!
//! 1. **Object Keys**: Sorted lexicographically by UTF-16 code units
//! 2. **Numbers**: Minimal representation
//! 3. **Strings**: Minimal escaping (only `"`, `\` and control characters)
//! 4. **Whitespace**: None
//!
//! ## References
//!
//! - **RFC 8785** - "JSON Canonicalization Scheme (JCS)"
//!   <https://www.rfc-editor.org/rfc/rfc8785>

use crate::models::{Hash, Manifest, ManifestDocument};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Domain separation prefix for manifest digests.
pub const DIGEST_DOMAIN: &[u8] = b"sourceguard/manifest/v1\n";

/// Canonicalizes a JSON value according to RFC 8785.
///
/// ```rust
/// use sourceguard_manifest::canonicalize::canonicalize;
/// use serde_json::json;
///
/// let canonical = canonicalize(&json!({"zulu": true, "alpha": [3, 2, 1]}));
/// assert_eq!(canonical, r#"{"alpha":[3,2,1],"zulu":true}"#);
/// ```
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

/// Canonical JSON text of a manifest's document form.
pub fn canonical_manifest(manifest: &Manifest) -> String {
    canonical_document(&manifest.to_document())
}

/// Canonical JSON text of a manifest document.
pub fn canonical_document(document: &ManifestDocument) -> String {
    let value = serde_json::json!({
        "version": document.version,
        "algorithm": document.algorithm,
        "entries": document.entries,
    });
    canonicalize(&value)
}

/// The digest a baseline signature covers.
///
/// ```rust
/// use sourceguard_manifest::{canonicalize::manifest_digest, Manifest};
///
/// let mut a = Manifest::new();
/// a.insert("index.php", [1u8; 32]).unwrap();
/// let mut b = a.clone();
/// assert_eq!(manifest_digest(&a), manifest_digest(&b));
///
/// b.insert("extra.php", [2u8; 32]).unwrap();
/// assert_ne!(manifest_digest(&a), manifest_digest(&b));
/// ```
pub fn manifest_digest(manifest: &Manifest) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(DIGEST_DOMAIN);
    hasher.update(canonical_manifest(manifest).as_bytes());
    hasher.finalize().into()
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => write_number(out, n),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.encode_utf16().cmp(b.encode_utf16()));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                write_value(out, item);
            }
            out.push('}');
        }
    }
}

fn write_number(out: &mut String, n: &serde_json::Number) {
    if let Some(i) = n.as_i64() {
        out.push_str(&i.to_string());
    } else if let Some(u) = n.as_u64() {
        out.push_str(&u.to_string());
    } else if let Some(f) = n.as_f64() {
        if f.is_finite() && f.fract() == 0.0 && f.abs() < (i64::MAX as f64) {
            out.push_str(&(f as i64).to_string());
        } else if f.is_finite() {
            out.push_str(&f.to_string());
        } else {
            out.push_str("null");
        }
    } else {
        out.push_str(&n.to_string());
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\x08' => out.push_str("\\b"),
            '\x0C' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c < '\x20' => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}
