//! Verdict types for integrity checks.

use serde::{Deserialize, Serialize};

/// Whole-tree integrity status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityStatus {
    /// Nothing has been approved yet.
    NoBaseline,

    /// The tree matches a baseline whose signature verified.
    Clean,

    /// The tree differs from the baseline, or the baseline is not authentic.
    Compromised,
}

impl IntegrityStatus {
    /// Returns true only for [`IntegrityStatus::Clean`].
    pub fn is_clean(self) -> bool {
        matches!(self, Self::Clean)
    }
}

impl std::fmt::Display for IntegrityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoBaseline => f.write_str("no_baseline"),
            Self::Clean => f.write_str("clean"),
            Self::Compromised => f.write_str("compromised"),
        }
    }
}

/// The outcome of the per-request gate.
///
/// The gate returns one of two verdicts:
/// - `Pass`: every critical file matches the signed baseline
/// - `Fail`: anything else, with the first reason found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateVerdict {
    /// All critical files verified.
    Pass,

    /// The request must be refused.
    Fail {
        /// Why the gate failed.
        reason: GateFailure,
    },
}

impl GateVerdict {
    /// Create a Fail verdict.
    pub fn fail(reason: GateFailure) -> Self {
        Self::Fail { reason }
    }

    /// Returns true if this is a Pass verdict.
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    /// The failure reason, if any.
    pub fn failure(&self) -> Option<&GateFailure> {
        match self {
            Self::Pass => None,
            Self::Fail { reason } => Some(reason),
        }
    }
}

/// Reasons the gate refuses traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateFailure {
    /// No approved baseline.
    NoBaseline,

    /// Baseline files are missing or unparsable.
    BaselineCorrupt {
        /// What was wrong.
        detail: String,
    },

    /// No critical paths configured.
    NoCriticalPaths,

    /// A critical path has no baseline entry.
    NotInBaseline {
        /// The critical path.
        path: String,
    },

    /// A critical file is gone.
    MissingOnDisk {
        /// The critical path.
        path: String,
    },

    /// A critical path is a directory, symlink or special file.
    NotRegularFile {
        /// The critical path.
        path: String,
    },

    /// A critical file could not be read.
    Unreadable {
        /// The critical path.
        path: String,
        /// The I/O error.
        detail: String,
    },

    /// A critical file's content changed.
    HashMismatch {
        /// The critical path.
        path: String,
        /// Baseline hash (hex).
        expected: String,
        /// Current hash (hex).
        actual: String,
    },

    /// Baseline signature did not verify against the trusted key.
    SignatureMismatched,

    /// Baseline signature or public key is absent.
    SignatureMissing,

    /// The gate itself failed.
    Internal {
        /// Description.
        detail: String,
    },
}

impl std::fmt::Display for GateFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoBaseline => write!(f, "No approved baseline"),
            Self::BaselineCorrupt { detail } => write!(f, "Baseline corrupt: {}", detail),
            Self::NoCriticalPaths => write!(f, "No critical paths configured"),
            Self::NotInBaseline { path } => {
                write!(f, "Critical file '{}' is not in the baseline", path)
            }
            Self::MissingOnDisk { path } => write!(f, "Critical file '{}' is missing", path),
            Self::NotRegularFile { path } => {
                write!(f, "Critical path '{}' is not a regular file", path)
            }
            Self::Unreadable { path, detail } => {
                write!(f, "Critical file '{}' is unreadable: {}", path, detail)
            }
            Self::HashMismatch { path, expected, actual } => write!(
                f,
                "Hash mismatch on '{}': expected {}, got {}",
                path, expected, actual
            ),
            Self::SignatureMismatched => write!(f, "Baseline signature does not verify"),
            Self::SignatureMissing => write!(f, "Baseline signature or public key missing"),
            Self::Internal { detail } => write!(f, "Gate error: {}", detail),
        }
    }
}
