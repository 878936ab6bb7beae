//! # Path Classifier
//!
//! Decides, per filesystem entry, whether it is tracked by the manifest.
//!
//! Rules, applied in order:
//!
//! 1. The path must lie under one of the configured watched roots.
//! 2. The path is excluded if it, or any of its ancestor directories, matches
//!    an exclusion rule.
//!
//! Exclusion rules come in two flavours. A pattern containing any of
//! `* ? [ {` is compiled as a glob and matched against the normalized
//! relative path; anything else is a plain substring of that path (so
//! `storage/` excludes `app/storage/cache.bin`). Directory rules are checked
//! against `dir + "/"`, which lets the walker prune excluded directories
//! without changing the answer `is_in_scope` gives for the files below them.
//!
//! Directories added with [`PathClassifier::exclude_dir`] are anchored at the
//! deployment root: `state/keys` excludes `state/keys/...` and nothing else.
//!
//! Classification is pure: the same inputs always produce the same answer,
//! so two walks over an unchanged tree agree.

use crate::models::{ManifestError, Result};
use crate::path::{is_under, normalize_rel_str, normalize_relative};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Exclusions applied when a scope does not override them.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git/",
    ".svn/",
    ".hg/",
    "node_modules/",
    "vendor/",
    "storage/",
    "cache/",
    "*.log",
    "*.cache",
    "*.tmp",
];

/// What to walk and what to ignore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanScope {
    /// Root every manifest path is relative to.
    pub deployment_root: PathBuf,

    /// Relative roots to walk. `"."` is the whole deployment root.
    pub watched_roots: Vec<String>,

    /// Exclusion rules (substrings or globs).
    pub exclude: Vec<String>,
}

impl ScanScope {
    /// A scope covering all of `deployment_root` with the default exclusions.
    pub fn new(deployment_root: impl Into<PathBuf>) -> Self {
        Self {
            deployment_root: deployment_root.into(),
            watched_roots: vec![".".to_string()],
            exclude: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// A single exclusion rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionRule {
    /// Matches if the normalized path contains this text.
    Substring(String),

    /// Matches if the normalized path matches this glob.
    Glob(String),
}

impl ExclusionRule {
    /// Classifies a raw configuration pattern.
    pub fn parse(raw: &str) -> Self {
        if raw.contains(['*', '?', '[', '{']) {
            ExclusionRule::Glob(raw.to_string())
        } else {
            ExclusionRule::Substring(raw.replace('\\', "/"))
        }
    }
}

/// Scope decision engine used by the builder and by configuration checks.
#[derive(Debug, Clone)]
pub struct PathClassifier {
    deployment_root: PathBuf,
    watched_roots: Vec<String>,
    substrings: Vec<String>,
    globs: GlobSet,
    anchored: Vec<String>,
}

impl PathClassifier {
    /// Compiles a scope.
    ///
    /// Watched roots are normalized and nested roots are collapsed into their
    /// ancestor so no file can be visited twice.
    ///
    /// # Errors
    ///
    /// - `ManifestError::InvalidPath` for a watched root that is absolute or
    ///   escapes the deployment root.
    /// - `ManifestError::Pattern` for an invalid glob.
    pub fn new(scope: &ScanScope) -> Result<Self> {
        let mut roots = Vec::with_capacity(scope.watched_roots.len());
        for raw in &scope.watched_roots {
            roots.push(normalize_rel_str(raw)?);
        }
        roots.sort();
        roots.dedup();
        let collapsed: Vec<String> = roots
            .iter()
            .filter(|root| {
                !roots
                    .iter()
                    .any(|other| other != *root && is_under(root, other))
            })
            .cloned()
            .collect();

        let mut substrings = Vec::new();
        let mut builder = GlobSetBuilder::new();
        for raw in &scope.exclude {
            match ExclusionRule::parse(raw) {
                ExclusionRule::Substring(text) => {
                    if !text.is_empty() {
                        substrings.push(text);
                    }
                }
                ExclusionRule::Glob(pattern) => {
                    let glob = Glob::new(&pattern).map_err(|source| ManifestError::Pattern {
                        pattern: pattern.clone(),
                        source,
                    })?;
                    builder.add(glob);
                }
            }
        }
        let globs = builder.build().map_err(|source| ManifestError::Pattern {
            pattern: scope.exclude.join(", "),
            source,
        })?;

        Ok(Self {
            deployment_root: scope.deployment_root.clone(),
            watched_roots: collapsed,
            substrings,
            globs,
            anchored: Vec::new(),
        })
    }

    /// Excludes one directory, anchored at the deployment root.
    ///
    /// Used to keep the baseline store and key directory out of the manifest
    /// when they live inside the deployment tree. A directory with the same
    /// name elsewhere in the tree stays in scope.
    pub fn exclude_dir(&mut self, rel_dir: &str) -> Result<()> {
        let normalized = normalize_rel_str(rel_dir)?;
        if normalized.is_empty() {
            return Err(ManifestError::InvalidPath(
                "refusing to exclude the deployment root".to_string(),
            ));
        }
        if !self.anchored.contains(&normalized) {
            self.anchored.push(normalized);
        }
        Ok(())
    }

    /// The deployment root.
    pub fn deployment_root(&self) -> &Path {
        &self.deployment_root
    }

    /// Normalized, collapsed watched roots.
    pub fn watched_roots(&self) -> &[String] {
        &self.watched_roots
    }

    /// Returns true if the normalized relative file path is tracked.
    pub fn is_in_scope(&self, rel: &str) -> bool {
        if rel.is_empty() {
            return false;
        }
        if !self.watched_roots.iter().any(|root| is_under(rel, root)) {
            return false;
        }
        !self.is_excluded(rel)
    }

    /// Like [`is_in_scope`](Self::is_in_scope) for an absolute or
    /// root-relative filesystem path. Paths that cannot be normalized are
    /// out of scope.
    pub fn is_in_scope_path(&self, path: &Path) -> bool {
        match normalize_relative(&self.deployment_root, path) {
            Ok(rel) => self.is_in_scope(&rel),
            Err(_) => false,
        }
    }

    /// Returns true if the walker should skip the directory and everything
    /// beneath it.
    pub fn prunes_dir(&self, rel_dir: &str) -> bool {
        if rel_dir.is_empty() {
            return false;
        }
        self.dir_matches(rel_dir) || self.ancestors_match(rel_dir)
    }

    fn is_excluded(&self, rel: &str) -> bool {
        if self.anchored.iter().any(|dir| is_under(rel, dir)) {
            return true;
        }
        if self.substrings.iter().any(|s| rel.contains(s.as_str())) {
            return true;
        }
        if self.globs.is_match(Path::new(rel)) {
            return true;
        }
        self.ancestors_match(rel)
    }

    fn ancestors_match(&self, rel: &str) -> bool {
        rel.match_indices('/')
            .any(|(idx, _)| self.dir_matches(&rel[..idx]))
    }

    fn dir_matches(&self, rel_dir: &str) -> bool {
        if self.anchored.iter().any(|dir| is_under(rel_dir, dir)) {
            return true;
        }
        let with_slash = format!("{}/", rel_dir);
        self.substrings
            .iter()
            .any(|s| with_slash.contains(s.as_str()))
            || self.globs.is_match(Path::new(rel_dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier(roots: &[&str], exclude: &[&str]) -> PathClassifier {
        PathClassifier::new(&ScanScope {
            deployment_root: PathBuf::from("/srv/site"),
            watched_roots: roots.iter().map(|s| s.to_string()).collect(),
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
        })
        .unwrap()
    }

    #[test]
    fn test_rule_parse() {
        assert_eq!(
            ExclusionRule::parse("*.log"),
            ExclusionRule::Glob("*.log".to_string())
        );
        assert_eq!(
            ExclusionRule::parse(".git/"),
            ExclusionRule::Substring(".git/".to_string())
        );
    }

    #[test]
    fn test_outside_watched_roots() {
        let c = classifier(&["app", "public/index.php"], &[]);
        assert!(c.is_in_scope("app/boot.rs"));
        assert!(c.is_in_scope("public/index.php"));
        assert!(!c.is_in_scope("public/other.php"));
        assert!(!c.is_in_scope("application/x.rs"));
    }

    #[test]
    fn test_substring_exclusion() {
        let c = classifier(&["."], &["storage/", ".git/"]);
        assert!(!c.is_in_scope("storage/app.db"));
        assert!(!c.is_in_scope("app/storage/x.bin"));
        assert!(!c.is_in_scope(".git/HEAD"));
        assert!(c.is_in_scope("app/storage.rs"));
    }

    #[test]
    fn test_glob_exclusion() {
        let c = classifier(&["."], &["*.log", "**/tmp"]);
        assert!(!c.is_in_scope("error.log"));
        assert!(!c.is_in_scope("var/deep/error.log"));
        assert!(!c.is_in_scope("var/tmp/upload.bin"));
        assert!(c.is_in_scope("var/logger.rs"));
    }

    #[test]
    fn test_prune_agrees_with_scope() {
        let c = classifier(&["."], &["cache/", "**/tmp"]);
        assert!(c.prunes_dir("cache"));
        assert!(c.prunes_dir("app/cache"));
        assert!(c.prunes_dir("var/tmp"));
        assert!(!c.prunes_dir("app"));
        assert!(!c.is_in_scope("app/cache/x"));
        assert!(!c.is_in_scope("var/tmp/x"));
    }

    #[test]
    fn test_nested_roots_collapse() {
        let c = classifier(&["app/http", "app", "./app"], &[]);
        assert_eq!(c.watched_roots(), &["app".to_string()]);
    }

    #[test]
    fn test_exclude_dir() {
        let mut c = classifier(&["."], &[]);
        assert!(c.is_in_scope(".sourceguard/manifest.json"));
        c.exclude_dir(".sourceguard").unwrap();
        assert!(!c.is_in_scope(".sourceguard/manifest.json"));
        assert!(c.exclude_dir(".").is_err());
    }

    #[test]
    fn test_exclude_dir_is_anchored() {
        let mut c = classifier(&["."], &[]);
        c.exclude_dir("state/keys").unwrap();

        assert!(!c.is_in_scope("state/keys/signing.key"));
        assert!(c.prunes_dir("state/keys"));
        assert!(c.prunes_dir("state/keys/old"));

        // Same names deeper in the tree are ordinary files.
        assert!(c.is_in_scope("public/uploads/realestate/keys/shell.php"));
        assert!(c.is_in_scope("public/state/keys/shell.php"));
        assert!(c.is_in_scope("state/keys.php"));
        assert!(!c.prunes_dir("public/state/keys"));
        assert!(!c.prunes_dir("state"));
    }

    #[test]
    fn test_is_in_scope_path() {
        let c = classifier(&["app"], &[]);
        assert!(c.is_in_scope_path(Path::new("/srv/site/app/boot.rs")));
        assert!(!c.is_in_scope_path(Path::new("/etc/passwd")));
    }

    #[test]
    fn test_invalid_glob() {
        let scope = ScanScope {
            deployment_root: PathBuf::from("/srv/site"),
            watched_roots: vec![".".to_string()],
            exclude: vec!["[unclosed".to_string()],
        };
        assert!(matches!(
            PathClassifier::new(&scope),
            Err(ManifestError::Pattern { .. })
        ));
    }
}
