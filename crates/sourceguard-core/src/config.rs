//! Configuration types for Sourceguard.

use crate::error::GuardError;
use crate::Result;
use serde::{Deserialize, Serialize};
use sourceguard_manifest::path::{normalize_rel_str, normalize_relative};
use sourceguard_manifest::{PathClassifier, ScanScope, DEFAULT_EXCLUDES};
use sourceguard_signing::{parse_public_key, VerifyingKey};
use std::path::{Component, Path, PathBuf};

/// Configuration for the integrity orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// What to track.
    pub scope: ScopeConfig,

    /// Per-request gate settings.
    pub gate: GateConfig,

    /// Where baselines and keys live.
    pub storage: StorageConfig,

    /// Audit trail settings.
    pub audit: AuditConfig,
}

/// Tracked tree configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// Root every manifest path is relative to.
    pub deployment_root: PathBuf,

    /// Relative roots to walk.
    pub watched_roots: Vec<String>,

    /// Exclusion rules: globs if they contain `* ? [ {`, substrings otherwise.
    pub exclude: Vec<String>,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            deployment_root: PathBuf::from("."),
            watched_roots: vec![".".to_string()],
            exclude: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Fast gate configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Files re-hashed on every request. Must not be empty.
    pub critical_paths: Vec<String>,

    /// Hex Ed25519 public key. Takes precedence over the key directory.
    pub trusted_public_key: Option<String>,
}

/// Persistent state locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Baseline store directory.
    pub baseline_dir: PathBuf,

    /// Key directory. Must not be served by the web tier.
    pub key_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            baseline_dir: PathBuf::from("/var/lib/sourceguard/baseline"),
            key_dir: PathBuf::from("/etc/sourceguard/keys"),
        }
    }
}

/// Audit trail configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Emit audit entries as `tracing` events.
    pub log_to_tracing: bool,

    /// Persistent append-only audit database.
    pub db_path: Option<PathBuf>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_to_tracing: true,
            db_path: None,
        }
    }
}

impl GuardConfig {
    /// A configuration for `deployment_root` guarding `critical_paths`,
    /// with state stored in `state_dir/baseline` and `state_dir/keys`.
    pub fn for_deployment(
        deployment_root: impl Into<PathBuf>,
        state_dir: impl AsRef<Path>,
        critical_paths: &[&str],
    ) -> Self {
        let state_dir = state_dir.as_ref();
        Self {
            scope: ScopeConfig {
                deployment_root: deployment_root.into(),
                ..ScopeConfig::default()
            },
            gate: GateConfig {
                critical_paths: critical_paths.iter().map(|s| s.to_string()).collect(),
                trusted_public_key: None,
            },
            storage: StorageConfig {
                baseline_dir: state_dir.join("baseline"),
                key_dir: state_dir.join("keys"),
            },
            audit: AuditConfig::default(),
        }
    }

    /// Loads a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|e| GuardError::io(path, e))?;
        serde_json::from_slice(&raw)
            .map_err(|e| GuardError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Writes the configuration as pretty JSON.
    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let payload = serde_json::to_string_pretty(self)
            .map_err(|e| GuardError::Config(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| GuardError::io(parent, e))?;
        }
        std::fs::write(path, payload).map_err(|e| GuardError::io(path, e))
    }

    /// Checks the configuration and compiles everything derived from it.
    pub fn validate(&self) -> Result<ResolvedConfig> {
        if self.scope.watched_roots.is_empty() {
            return Err(GuardError::Config("scope.watched_roots is empty".to_string()));
        }
        if self.gate.critical_paths.is_empty() {
            return Err(GuardError::Config(
                "gate.critical_paths is empty; the request gate would have nothing to check"
                    .to_string(),
            ));
        }

        let deployment_root = absolutize(&self.scope.deployment_root)?;
        let baseline_dir = absolutize(&self.storage.baseline_dir)?;
        let key_dir = absolutize(&self.storage.key_dir)?;

        let scope = ScanScope {
            deployment_root: deployment_root.clone(),
            watched_roots: self.scope.watched_roots.clone(),
            exclude: self.scope.exclude.clone(),
        };
        let mut classifier = PathClassifier::new(&scope)
            .map_err(|e| GuardError::Config(format!("scope: {}", e)))?;

        for state_dir in [&baseline_dir, &key_dir] {
            if !state_dir.starts_with(&deployment_root) {
                continue;
            }
            let rel = normalize_relative(&deployment_root, state_dir)?;
            if rel.is_empty() {
                return Err(GuardError::Config(format!(
                    "{} cannot be the deployment root itself",
                    state_dir.display()
                )));
            }
            classifier.exclude_dir(&rel)?;
        }

        let mut critical_paths = Vec::with_capacity(self.gate.critical_paths.len());
        for raw in &self.gate.critical_paths {
            let normalized = normalize_rel_str(raw)
                .map_err(|e| GuardError::Config(format!("critical path '{}': {}", raw, e)))?;
            if !classifier.is_in_scope(&normalized) {
                return Err(GuardError::Config(format!(
                    "critical path '{}' is not tracked by the manifest scope",
                    raw
                )));
            }
            if !critical_paths.contains(&normalized) {
                critical_paths.push(normalized);
            }
        }

        let trusted_public_key = self
            .gate
            .trusted_public_key
            .as_deref()
            .map(parse_public_key)
            .transpose()
            .map_err(|e| GuardError::Config(format!("gate.trusted_public_key: {}", e)))?;

        Ok(ResolvedConfig {
            deployment_root,
            baseline_dir,
            key_dir,
            classifier,
            critical_paths,
            trusted_public_key,
        })
    }
}

/// A validated configuration with absolute paths and compiled rules.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute deployment root.
    pub deployment_root: PathBuf,
    /// Absolute baseline store directory.
    pub baseline_dir: PathBuf,
    /// Absolute key directory.
    pub key_dir: PathBuf,
    /// Classifier with state directories excluded.
    pub classifier: PathClassifier,
    /// Normalized, de-duplicated critical paths.
    pub critical_paths: Vec<String>,
    /// Parsed trusted public key, if configured.
    pub trusted_public_key: Option<VerifyingKey>,
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| GuardError::io(path, e))?
            .join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = GuardConfig::default();
        assert_eq!(config.scope.watched_roots, vec![".".to_string()]);
        assert!(config.gate.critical_paths.is_empty());
        assert!(config.audit.log_to_tracing);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = GuardConfig::for_deployment("/srv/site", "/var/lib/sg", &["index.php"]);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: GuardConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.gate.critical_paths, config.gate.critical_paths);
        assert_eq!(parsed.storage.key_dir, PathBuf::from("/var/lib/sg/keys"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let parsed: GuardConfig =
            serde_json::from_str(r#"{"gate": {"critical_paths": ["index.php"]}}"#).unwrap();
        assert_eq!(parsed.scope.exclude.len(), DEFAULT_EXCLUDES.len());
        assert!(parsed.gate.trusted_public_key.is_none());
    }

    #[test]
    fn test_validate_normalizes_critical_paths() {
        let config = GuardConfig::for_deployment(
            "/srv/site",
            "/var/lib/sg",
            &["./public/index.php", "public\\index.php", "app/boot.php"],
        );
        let resolved = config.validate().unwrap();
        assert_eq!(
            resolved.critical_paths,
            vec!["public/index.php".to_string(), "app/boot.php".to_string()]
        );
    }

    #[test]
    fn test_validate_rejects_excluded_critical_path() {
        let config = GuardConfig::for_deployment("/srv/site", "/var/lib/sg", &["storage/x.php"]);
        assert!(matches!(config.validate(), Err(GuardError::Config(_))));

        let config = GuardConfig::for_deployment("/srv/site", "/var/lib/sg", &["../etc/passwd"]);
        assert!(matches!(config.validate(), Err(GuardError::Config(_))));
    }

    #[test]
    fn test_validate_excludes_state_dirs_inside_root() {
        let config =
            GuardConfig::for_deployment("/srv/site", "/srv/site/.sourceguard", &["index.php"]);
        let resolved = config.validate().unwrap();
        assert!(!resolved
            .classifier
            .is_in_scope(".sourceguard/baseline/CURRENT"));
        assert!(!resolved.classifier.is_in_scope(".sourceguard/keys/signing.pub"));
        assert!(resolved.classifier.is_in_scope("index.php"));
        assert!(resolved
            .classifier
            .is_in_scope("uploads/.sourceguard/baseline/shell.php"));
    }

    #[test]
    fn test_validate_rejects_bad_trusted_key() {
        let mut config = GuardConfig::for_deployment("/srv/site", "/var/lib/sg", &["index.php"]);
        config.gate.trusted_public_key = Some("not-a-key".to_string());
        assert!(matches!(config.validate(), Err(GuardError::Config(_))));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf/sourceguard.json");
        let config = GuardConfig::for_deployment("/srv/site", "/var/lib/sg", &["index.php"]);
        config.write_file(&path).unwrap();

        let loaded = GuardConfig::from_file(&path).unwrap();
        assert_eq!(loaded.gate.critical_paths, vec!["index.php".to_string()]);
        assert!(GuardConfig::from_file(dir.path().join("missing.json")).is_err());
    }
}
