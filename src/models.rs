use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A package at one concrete version. The deduplication key of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageIdentity {
    pub name: String,
    pub version: String,
}

impl PackageIdentity {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl std::fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// Tri-state compatibility with the target platform.
///
/// Variants are declared in dominance order so that `max` picks the
/// more severe of two statuses: Incompatible > Unknown > Compatible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompatibilityStatus {
    Compatible,
    Unknown,
    Incompatible,
}

impl CompatibilityStatus {
    /// Combine two statuses, keeping the dominant one.
    pub fn combine(self, other: CompatibilityStatus) -> CompatibilityStatus {
        self.max(other)
    }
}

impl std::fmt::Display for CompatibilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompatibilityStatus::Compatible => write!(f, "compatible"),
            CompatibilityStatus::Unknown => write!(f, "unknown"),
            CompatibilityStatus::Incompatible => write!(f, "incompatible"),
        }
    }
}

/// A raw `(name, version)` pair as declared in a manifest, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub version: String,
}

impl ManifestEntry {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// One project's declared direct dependencies, in manifest order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectManifest {
    pub name: String,
    pub path: Option<PathBuf>,
    pub entries: Vec<ManifestEntry>,
}

impl ProjectManifest {
    pub fn new(name: impl Into<String>, entries: Vec<ManifestEntry>) -> Self {
        Self {
            name: name.into(),
            path: None,
            entries,
        }
    }

    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = Some(path);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    MalformedManifestEntry,
    LookupUnavailable,
    CycleDetected,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticKind::MalformedManifestEntry => write!(f, "malformed entry"),
            DiagnosticKind::LookupUnavailable => write!(f, "lookup unavailable"),
            DiagnosticKind::CycleDetected => write!(f, "cycle"),
        }
    }
}

/// A per-package problem recorded during a run. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Project that surfaced the problem, when it is attributable to one.
    pub project: Option<String>,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(project: Option<&str>, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            project: project.map(str::to_string),
            kind,
            message: message.into(),
        }
    }
}
