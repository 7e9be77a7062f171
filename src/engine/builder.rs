use std::collections::HashSet;

use futures::future::join_all;
use tracing::warn;

use super::registry::NodeRegistry;
use super::result::ProjectSubgraph;
use crate::models::{Diagnostic, DiagnosticKind, ManifestEntry, PackageIdentity};

/// Turns one project's flat package list into its top-level node handles.
///
/// Resolution of transitive dependencies belongs to the [`NodeRegistry`];
/// the builder only validates entries and keeps manifest order.
pub struct GraphBuilder<'a> {
    registry: &'a NodeRegistry,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(registry: &'a NodeRegistry) -> Self {
        Self { registry }
    }

    pub async fn build(
        &self,
        project: &str,
        entries: &[ManifestEntry],
    ) -> (ProjectSubgraph, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let mut seen = HashSet::new();
        let mut identities = Vec::with_capacity(entries.len());

        for (position, entry) in entries.iter().enumerate() {
            match validate(entry) {
                Ok(identity) => {
                    if seen.insert(identity.clone()) {
                        identities.push(identity);
                    }
                }
                Err(reason) => {
                    warn!(project, position, reason, "skipping manifest entry");
                    diagnostics.push(Diagnostic::new(
                        Some(project),
                        DiagnosticKind::MalformedManifestEntry,
                        format!("entry #{} ({:?} {:?}): {}", position + 1, entry.name, entry.version, reason),
                    ));
                }
            }
        }

        // join_all yields results in input order, so manifest order survives.
        let roots = join_all(
            identities
                .into_iter()
                .map(|identity| self.registry.get_or_create(identity)),
        )
        .await;

        (ProjectSubgraph::new(project, roots), diagnostics)
    }
}

fn validate(entry: &ManifestEntry) -> Result<PackageIdentity, &'static str> {
    let name = entry.name.trim();
    let version = entry.version.trim();
    if name.is_empty() {
        return Err("empty package name");
    }
    if version.is_empty() {
        return Err("empty package version");
    }
    Ok(PackageIdentity::new(name, version))
}
