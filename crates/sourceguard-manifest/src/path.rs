//! # Path Normalization
//!
//! Manifests must be portable across hosts, so every path is reduced to a
//! single canonical spelling before it is stored or compared:
//!
//! - relative to the deployment root
//! - `/` as the only separator
//! - no `.` segments, no `..` segments, no leading or trailing `/`
//!
//! Normalization happens once, at the edge (walker output, configuration
//! strings). Comparison code never normalizes; it compares strings.
//!
//! Case is preserved. `App/Boot.rs` and `app/boot.rs` are different paths.

use crate::models::{ManifestError, Result};
use std::path::{Component, Path};

/// Normalizes `path` relative to `root`.
///
/// `path` may be absolute (it must then lie under `root`) or relative to
/// `root`. `..` segments are resolved lexically and must not climb above the
/// root.
///
/// # Errors
///
/// `ManifestError::InvalidPath` if the path lies outside `root`, escapes it
/// via `..`, or is not valid UTF-8.
///
/// # Example
///
/// ```rust
/// use sourceguard_manifest::path::normalize_relative;
/// use std::path::Path;
///
/// let root = Path::new("/srv/site");
/// assert_eq!(
///     normalize_relative(root, Path::new("/srv/site/app/./boot.rs")).unwrap(),
///     "app/boot.rs"
/// );
/// assert!(normalize_relative(root, Path::new("/etc/passwd")).is_err());
/// ```
pub fn normalize_relative(root: &Path, path: &Path) -> Result<String> {
    let relative = if path.is_absolute() {
        path.strip_prefix(root).map_err(|_| {
            ManifestError::InvalidPath(format!(
                "{} is outside {}",
                path.display(),
                root.display()
            ))
        })?
    } else {
        path
    };

    let mut segments: Vec<&str> = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| {
                    ManifestError::InvalidPath(format!("{} is not UTF-8", path.display()))
                })?;
                segments.push(part);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if segments.pop().is_none() {
                    return Err(ManifestError::InvalidPath(format!(
                        "{} escapes the deployment root",
                        path.display()
                    )));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(ManifestError::InvalidPath(format!(
                    "{} is absolute",
                    path.display()
                )));
            }
        }
    }

    Ok(segments.join("/"))
}

/// Normalizes a configured relative path string.
///
/// Accepts `\` as a separator so configuration written on Windows hosts
/// produces the same manifest keys. An empty result (e.g. `"."`) denotes the
/// deployment root itself.
///
/// # Errors
///
/// `ManifestError::InvalidPath` for absolute paths or `..` escaping the root.
pub fn normalize_rel_str(raw: &str) -> Result<String> {
    let unified = raw.replace('\\', "/");
    if unified.starts_with('/') || has_drive_prefix(&unified) {
        return Err(ManifestError::InvalidPath(format!("{} is absolute", raw)));
    }

    let mut segments: Vec<&str> = Vec::new();
    for part in unified.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(ManifestError::InvalidPath(format!(
                        "{} escapes the deployment root",
                        raw
                    )));
                }
            }
            other => segments.push(other),
        }
    }

    Ok(segments.join("/"))
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Returns true if `path` equals `root` or lies beneath it.
///
/// Both arguments must already be normalized. The empty root contains
/// everything.
pub fn is_under(path: &str, root: &str) -> bool {
    if root.is_empty() {
        return true;
    }
    path == root
        || (path.len() > root.len()
            && path.starts_with(root)
            && path.as_bytes()[root.len()] == b'/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_normalize_relative_strips_root() {
        let root = PathBuf::from("/srv/site");
        let path = root.join("app").join("boot.rs");
        assert_eq!(normalize_relative(&root, &path).unwrap(), "app/boot.rs");
    }

    #[test]
    fn test_normalize_relative_resolves_dots() {
        let root = PathBuf::from("/srv/site");
        assert_eq!(
            normalize_relative(&root, Path::new("app/../lib/./x.rs")).unwrap(),
            "lib/x.rs"
        );
        assert!(normalize_relative(&root, Path::new("../outside.rs")).is_err());
    }

    #[test]
    fn test_normalize_relative_rejects_foreign_absolute() {
        let root = PathBuf::from("/srv/site");
        assert!(normalize_relative(&root, Path::new("/srv/other/x.rs")).is_err());
    }

    #[test]
    fn test_normalize_rel_str() {
        assert_eq!(normalize_rel_str("app\\boot.rs").unwrap(), "app/boot.rs");
        assert_eq!(normalize_rel_str("./app//boot.rs").unwrap(), "app/boot.rs");
        assert_eq!(normalize_rel_str(".").unwrap(), "");
        assert_eq!(normalize_rel_str("App/Boot.rs").unwrap(), "App/Boot.rs");
        assert!(normalize_rel_str("/etc/passwd").is_err());
        assert!(normalize_rel_str("C:/windows").is_err());
        assert!(normalize_rel_str("app/../../x").is_err());
    }

    #[test]
    fn test_is_under() {
        assert!(is_under("app/boot.rs", "app"));
        assert!(is_under("app", "app"));
        assert!(is_under("anything", ""));
        assert!(!is_under("application/x.rs", "app"));
        assert!(!is_under("ap", "app"));
    }
}
