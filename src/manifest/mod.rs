//! Manifest readers: turn the package manifests found in one project
//! directory into raw `(name, version)` entries.
//!
//! Entries are returned as declared, without validation; the engine rejects
//! malformed ones with a diagnostic.

use std::path::Path;

use anyhow::Result;

use crate::models::ManifestEntry;

pub mod dotnet;

pub trait ManifestReader {
    /// Whether `dir` holds a manifest this reader understands.
    fn detect(&self, dir: &Path) -> bool;

    /// Entries of every manifest in `dir`, in declaration order.
    fn read(&self, dir: &Path) -> Result<Vec<ManifestEntry>>;
}
