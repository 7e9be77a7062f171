use std::collections::BTreeSet;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::{LookupError, MetadataRecord, MetadataSource};
use crate::models::{CompatibilityStatus, PackageIdentity};

const REGISTRATION_BASE: &str = "https://api.nuget.org/v3/registration5-semver1";
const USER_AGENT: &str = "compat-checkr/0.1.0 (platform compatibility tool)";

#[derive(Debug, Deserialize)]
struct RegistrationLeaf {
    #[serde(rename = "catalogEntry")]
    catalog_entry: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogEntry {
    #[serde(default)]
    dependency_groups: Vec<DependencyGroup>,
    #[serde(default)]
    package_entries: Vec<PackageEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DependencyGroup {
    target_framework: Option<String>,
    #[serde(default)]
    dependencies: Vec<CatalogDependency>,
}

#[derive(Debug, Deserialize)]
struct CatalogDependency {
    id: String,
    range: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageEntry {
    full_name: String,
}

/// Looks packages up in the NuGet v3 registry.
///
/// A package is compatible when one of its `lib/<tfm>/` folders or dependency
/// groups targets a framework starting with one of `compatible_frameworks`.
pub struct NugetSource {
    client: Client,
    base_url: String,
    compatible_frameworks: Vec<String>,
}

impl NugetSource {
    pub fn new(client: Client, compatible_frameworks: &[String]) -> Self {
        Self {
            client,
            base_url: REGISTRATION_BASE.to_string(),
            compatible_frameworks: compatible_frameworks
                .iter()
                .map(|f| normalize_framework(f))
                .collect(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        identity: &PackageIdentity,
    ) -> Result<T, LookupError> {
        let request_error = |source| LookupError::Request {
            identity: identity.clone(),
            source,
        };

        let response = self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(request_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound(identity.clone()));
        }
        let response = response.error_for_status().map_err(request_error)?;

        let body = response.text().await.map_err(request_error)?;
        serde_json::from_str(&body).map_err(|e| LookupError::Malformed {
            identity: identity.clone(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl MetadataSource for NugetSource {
    fn name(&self) -> &str {
        "nuget"
    }

    async fn lookup(&self, identity: &PackageIdentity) -> Result<MetadataRecord, LookupError> {
        let url = format!(
            "{}/{}/{}.json",
            self.base_url,
            identity.name.to_lowercase(),
            normalize_version(&identity.version)
        );

        let leaf: RegistrationLeaf = self.get_json(&url, identity).await?;
        let entry: CatalogEntry = self.get_json(&leaf.catalog_entry, identity).await?;

        Ok(evaluate_entry(&entry, &self.compatible_frameworks))
    }
}

/// Lowercase a target framework moniker and drop the leading dot of the
/// long form, so `.NETStandard2.0` and `netstandard2.0` compare equal.
fn normalize_framework(framework: &str) -> String {
    framework.trim().trim_start_matches('.').to_lowercase()
}

/// Framework folders found under `lib/` in the package.
fn lib_frameworks(entry: &CatalogEntry) -> BTreeSet<String> {
    entry
        .package_entries
        .iter()
        .filter_map(|e| {
            let path = e.full_name.replace('\\', "/");
            let mut parts = path.split('/');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(lib), Some(tfm), Some(_)) if lib.eq_ignore_ascii_case("lib") => {
                    Some(normalize_framework(tfm))
                }
                _ => None,
            }
        })
        .collect()
}

fn evaluate_entry(entry: &CatalogEntry, compatible: &[String]) -> MetadataRecord {
    let is_compatible = |tfm: &str| compatible.iter().any(|c| tfm.starts_with(c.as_str()));

    let matching_group = entry.dependency_groups.iter().find(|g| {
        g.target_framework
            .as_deref()
            .map(|tfm| is_compatible(&normalize_framework(tfm)))
            .unwrap_or(false)
    });
    let any_framework_group = entry
        .dependency_groups
        .iter()
        .find(|g| g.target_framework.as_deref().map_or(true, |t| t.trim().is_empty()));

    let libs = lib_frameworks(entry);
    let declared_frameworks = !libs.is_empty()
        || entry
            .dependency_groups
            .iter()
            .any(|g| g.target_framework.as_deref().is_some_and(|t| !t.trim().is_empty()));

    let status = if matching_group.is_some() || libs.iter().any(|tfm| is_compatible(tfm.as_str())) {
        CompatibilityStatus::Compatible
    } else if declared_frameworks {
        CompatibilityStatus::Incompatible
    } else {
        CompatibilityStatus::Unknown
    };

    let groups: Vec<&DependencyGroup> = match matching_group.or(any_framework_group) {
        Some(group) => vec![group],
        None => entry.dependency_groups.iter().collect(),
    };

    let mut seen = BTreeSet::new();
    let mut dependencies = Vec::new();
    for dep in groups.into_iter().flat_map(|g| g.dependencies.iter()) {
        let Some(version) = dep.range.as_deref().and_then(minimum_version) else {
            tracing::debug!(dependency = %dep.id, range = ?dep.range, "dependency range has no lower bound, skipped");
            continue;
        };
        let identity = PackageIdentity::new(dep.id.clone(), version);
        if seen.insert(identity.clone()) {
            dependencies.push(identity);
        }
    }

    MetadataRecord::new(status, dependencies)
}

/// Normalized form the registry keys its leaves by, lowercased.
///
/// `2.0` becomes `2.0.0`, `1.2.3.0` becomes `1.2.3`, leading zeros and
/// `+metadata` are dropped, and a prerelease label is kept. Versions that
/// are not dotted numbers are only lowercased.
fn normalize_version(version: &str) -> String {
    let version = version.trim();
    let version = version.split('+').next().unwrap_or(version);
    let (release, prerelease) = match version.split_once('-') {
        Some((release, label)) => (release, Some(label)),
        None => (version, None),
    };

    let parts: Result<Vec<u64>, _> = release.split('.').map(str::parse::<u64>).collect();
    let mut parts = match parts {
        Ok(parts) if (1..=4).contains(&parts.len()) => parts,
        _ => return version.to_lowercase(),
    };
    while parts.len() < 3 {
        parts.push(0);
    }
    if parts.len() == 4 && parts[3] == 0 {
        parts.pop();
    }

    let mut normalized = parts
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(".");
    if let Some(label) = prerelease {
        normalized.push('-');
        normalized.push_str(&label.to_lowercase());
    }
    normalized
}

/// Reduce a NuGet version range to its declared minimum version.
///
/// `1.2.0`, `[1.2.0, )`, `(1.2.0, 2.0)` and `[1.2.0]` all yield `1.2.0`;
/// ranges without a lower bound such as `(, 2.0]` yield `None`.
fn minimum_version(range: &str) -> Option<String> {
    let trimmed = range.trim();
    let inner = trimmed
        .trim_start_matches(&['[', '('][..])
        .trim_end_matches(&[']', ')'][..]);
    let lower = inner.split(',').next().unwrap_or("").trim();
    if lower.is_empty() {
        None
    } else {
        Some(lower.to_string())
    }
}
