//! Sources of per-package compatibility metadata.
//!
//! A [`MetadataSource`] answers two questions for a [`PackageIdentity`]: is it
//! usable on the target platform, and what does it depend on. Every
//! implementation returns `Ok(record)` when it knows the package,
//! `Err(LookupError::NotFound)` when it does not, and other errors on
//! transport or parse failures. The engine degrades all errors to
//! [`CompatibilityStatus::Unknown`].
//!
//! - [`nuget`] — NuGet v3 registry, online.
//! - [`catalog`] — TOML catalog file, offline.
//! - [`overrides`] — config-driven status overrides wrapping another source.

pub mod catalog;
pub mod nuget;
pub mod overrides;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{CompatibilityStatus, PackageIdentity};

/// What a source knows about one package version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub status: CompatibilityStatus,
    #[serde(default)]
    pub dependencies: Vec<PackageIdentity>,
}

impl MetadataRecord {
    pub fn new(status: CompatibilityStatus, dependencies: Vec<PackageIdentity>) -> Self {
        Self {
            status,
            dependencies,
        }
    }
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("no metadata for {0}")]
    NotFound(PackageIdentity),

    #[error("request for {identity} failed: {source}")]
    Request {
        identity: PackageIdentity,
        source: reqwest::Error,
    },

    #[error("malformed metadata for {identity}: {reason}")]
    Malformed {
        identity: PackageIdentity,
        reason: String,
    },
}

#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    async fn lookup(&self, identity: &PackageIdentity) -> Result<MetadataRecord, LookupError>;
}

/// Tries each source in order; the first answer other than `NotFound` wins.
pub struct LayeredSource {
    sources: Vec<Box<dyn MetadataSource>>,
}

impl LayeredSource {
    pub fn new(sources: Vec<Box<dyn MetadataSource>>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl MetadataSource for LayeredSource {
    fn name(&self) -> &str {
        "layered"
    }

    async fn lookup(&self, identity: &PackageIdentity) -> Result<MetadataRecord, LookupError> {
        for source in &self.sources {
            match source.lookup(identity).await {
                Err(LookupError::NotFound(_)) => {
                    tracing::trace!(source = source.name(), %identity, "not found, trying next source");
                }
                other => return other,
            }
        }
        Err(LookupError::NotFound(identity.clone()))
    }
}
