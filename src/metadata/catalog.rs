use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{LookupError, MetadataRecord, MetadataSource};
use crate::models::{CompatibilityStatus, PackageIdentity};

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    package: Vec<CatalogPackage>,
}

#[derive(Debug, Deserialize)]
struct CatalogPackage {
    name: String,
    version: String,
    status: CompatibilityStatus,
    #[serde(default)]
    dependencies: Vec<PackageIdentity>,
}

/// Offline metadata loaded from a TOML catalog:
///
/// ```toml
/// [[package]]
/// name = "Serilog"
/// version = "2.12.0"
/// status = "compatible"
/// dependencies = [{ name = "System.Memory", version = "4.5.4" }]
/// ```
pub struct CatalogSource {
    records: HashMap<PackageIdentity, MetadataRecord>,
}

impl CatalogSource {
    pub fn from_records(records: impl IntoIterator<Item = (PackageIdentity, MetadataRecord)>) -> Self {
        Self {
            records: records.into_iter().collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading catalog {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing catalog {}", path.display()))
    }

    fn parse(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)?;
        Ok(Self::from_records(file.package.into_iter().map(|p| {
            (
                PackageIdentity::new(p.name, p.version),
                MetadataRecord::new(p.status, p.dependencies),
            )
        })))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

#[async_trait]
impl MetadataSource for CatalogSource {
    fn name(&self) -> &str {
        "catalog"
    }

    async fn lookup(&self, identity: &PackageIdentity) -> Result<MetadataRecord, LookupError> {
        self.records
            .get(identity)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(identity.clone()))
    }
}
