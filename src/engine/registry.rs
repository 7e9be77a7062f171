use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::join_all;
use indicatif::ProgressBar;
use petgraph::graph::NodeIndex;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::graph::{DependencyGraph, NodeId};
use crate::metadata::{LookupError, MetadataSource};
use crate::models::{CompatibilityStatus, Diagnostic, DiagnosticKind, PackageIdentity};

/// Limits applied to metadata lookups during the build phase.
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// Upper bound for a single lookup; a lookup that takes longer is Unknown.
    pub timeout: Duration,
    /// How many lookups are in flight at once, across every builder.
    pub concurrency: usize,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            concurrency: 16,
        }
    }
}

struct Slot {
    identity: PackageIdentity,
    own: CompatibilityStatus,
    dependencies: Vec<NodeId>,
}

#[derive(Default)]
struct RegistryState {
    index: HashMap<PackageIdentity, NodeId>,
    slots: Vec<Slot>,
    diagnostics: Vec<Diagnostic>,
}

/// Deduplicates package identities into shared graph nodes while the graph
/// is being built.
///
/// Reserving a slot for a new identity is atomic, so concurrent builders
/// never look the same identity up twice. A reserved node may be referenced
/// before its own lookup finishes; its contents are only read after
/// [`NodeRegistry::freeze`].
pub struct NodeRegistry {
    source: Arc<dyn MetadataSource>,
    options: RegistryOptions,
    state: Mutex<RegistryState>,
    permits: Semaphore,
    progress: Option<ProgressBar>,
}

impl NodeRegistry {
    pub fn new(source: Arc<dyn MetadataSource>, options: RegistryOptions) -> Self {
        let permits = Semaphore::new(options.concurrency.max(1));
        Self {
            source,
            options,
            state: Mutex::new(RegistryState::default()),
            permits,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the node for `identity`, creating and resolving it (and every
    /// dependency not yet known) when it is new.
    pub async fn get_or_create(&self, identity: PackageIdentity) -> NodeId {
        let (root, created) = self.reserve(identity);
        if !created {
            return root;
        }

        let batch_size = self.options.concurrency.max(1);
        let mut pending = vec![root];

        while !pending.is_empty() {
            let take = pending.len().min(batch_size);
            let batch: Vec<(NodeId, PackageIdentity)> = pending
                .drain(..take)
                .map(|id| (id, self.identity_of(id)))
                .collect();

            let lookups = batch.into_iter().map(|(id, identity)| async move {
                let answer = self.lookup(&identity).await;
                (id, answer)
            });

            for (id, (own, dependencies)) in join_all(lookups).await {
                let mut dependency_ids: Vec<NodeId> = Vec::with_capacity(dependencies.len());
                for dependency in dependencies {
                    let (dep_id, created) = self.reserve(dependency);
                    if created {
                        pending.push(dep_id);
                    }
                    if !dependency_ids.contains(&dep_id) {
                        dependency_ids.push(dep_id);
                    }
                }
                self.complete(id, own, dependency_ids);
            }
        }

        root
    }

    /// Atomically find or reserve the slot for `identity`.
    /// Returns the handle and whether this call created it.
    fn reserve(&self, identity: PackageIdentity) -> (NodeId, bool) {
        let mut state = self.state();
        if let Some(&id) = state.index.get(&identity) {
            return (id, false);
        }

        let id = NodeIndex::new(state.slots.len());
        debug!(%identity, "new package node");
        state.index.insert(identity.clone(), id);
        state.slots.push(Slot {
            identity,
            own: CompatibilityStatus::Unknown,
            dependencies: Vec::new(),
        });
        drop(state);

        if let Some(pb) = &self.progress {
            pb.inc_length(1);
        }
        (id, true)
    }

    fn identity_of(&self, id: NodeId) -> PackageIdentity {
        self.state().slots[id.index()].identity.clone()
    }

    fn complete(&self, id: NodeId, own: CompatibilityStatus, dependencies: Vec<NodeId>) {
        {
            let mut state = self.state();
            let slot = &mut state.slots[id.index()];
            slot.own = own;
            slot.dependencies = dependencies;
        }
        if let Some(pb) = &self.progress {
            pb.inc(1);
        }
    }

    /// Query the metadata source, degrading every failure to Unknown.
    ///
    /// Waiting for a permit does not count against the lookup timeout.
    async fn lookup(&self, identity: &PackageIdentity) -> (CompatibilityStatus, Vec<PackageIdentity>) {
        // Never closed, so this always yields a permit.
        let _permit = self.permits.acquire().await.ok();
        let reason = match tokio::time::timeout(self.options.timeout, self.source.lookup(identity)).await {
            Ok(Ok(record)) => return (record.status, record.dependencies),
            Ok(Err(LookupError::NotFound(_))) => {
                debug!(%identity, source = self.source.name(), "no metadata");
                format!("{} has no record of {}", self.source.name(), identity)
            }
            Ok(Err(e)) => {
                warn!(%identity, error = %e, "metadata lookup failed");
                e.to_string()
            }
            Err(_) => {
                warn!(%identity, timeout = ?self.options.timeout, "metadata lookup timed out");
                format!(
                    "lookup of {} timed out after {}s",
                    identity,
                    self.options.timeout.as_secs_f32()
                )
            }
        };

        self.state().diagnostics.push(Diagnostic::new(
            None,
            DiagnosticKind::LookupUnavailable,
            reason,
        ));
        (CompatibilityStatus::Unknown, Vec::new())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.state().slots.len()
    }

    /// End the build phase and hand the nodes over to an immutable graph.
    pub fn freeze(self) -> (DependencyGraph, Vec<Diagnostic>) {
        let state = self.state.into_inner().unwrap_or_else(PoisonError::into_inner);
        let graph = DependencyGraph::from_slots(
            state
                .slots
                .into_iter()
                .map(|slot| (slot.identity, slot.own, slot.dependencies)),
        );
        (graph, state.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::ScriptedSource;

    fn id(name: &str, version: &str) -> PackageIdentity {
        PackageIdentity::new(name, version)
    }

    #[tokio::test]
    async fn test_resolves_transitive_dependencies() {
        let source = ScriptedSource::new()
            .package("Lib3", "1.0", CompatibilityStatus::Compatible, &[("Lib4", "1.0")])
            .package("Lib4", "1.0", CompatibilityStatus::Compatible, &[]);
        let registry = NodeRegistry::new(Arc::new(source), RegistryOptions::default());

        let root = registry.get_or_create(id("Lib3", "1.0")).await;
        let again = registry.get_or_create(id("Lib3", "1.0")).await;
        assert_eq!(root, again);
        assert_eq!(registry.len(), 2);

        let (graph, diagnostics) = registry.freeze();
        assert!(diagnostics.is_empty());
        let deps = graph.dependencies(root);
        assert_eq!(deps.len(), 1);
        assert_eq!(graph.node(deps[0]).identity, id("Lib4", "1.0"));
    }

    #[tokio::test]
    async fn test_missing_package_degrades_to_unknown() {
        let source = ScriptedSource::new();
        let registry = NodeRegistry::new(Arc::new(source), RegistryOptions::default());

        let node = registry.get_or_create(id("Ghost", "0.1")).await;
        let (graph, diagnostics) = registry.freeze();
        assert_eq!(graph.node(node).own, CompatibilityStatus::Unknown);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::LookupUnavailable);
    }

    #[tokio::test]
    async fn test_lookup_error_degrades_to_unknown() {
        let source = ScriptedSource::new().failing("Broken", "1.0");
        let registry = NodeRegistry::new(Arc::new(source), RegistryOptions::default());

        let node = registry.get_or_create(id("Broken", "1.0")).await;
        let (graph, diagnostics) = registry.freeze();
        assert_eq!(graph.node(node).own, CompatibilityStatus::Unknown);
        assert_eq!(diagnostics.len(), 1);
    }

    #[tokio::test]
    async fn test_hanging_lookup_times_out() {
        let source = ScriptedSource::new().hanging("Slow", "1.0");
        let options = RegistryOptions {
            timeout: Duration::from_millis(50),
            concurrency: 4,
        };
        let registry = NodeRegistry::new(Arc::new(source), options);

        let node = registry.get_or_create(id("Slow", "1.0")).await;
        let (graph, diagnostics) = registry.freeze();
        assert_eq!(graph.node(node).own, CompatibilityStatus::Unknown);
        assert!(diagnostics[0].message.contains("timed out"));
    }

    #[tokio::test]
    async fn test_cyclic_metadata_terminates() {
        let source = ScriptedSource::new()
            .package("A", "1.0", CompatibilityStatus::Compatible, &[("B", "1.0")])
            .package("B", "1.0", CompatibilityStatus::Compatible, &[("A", "1.0")]);
        let registry = NodeRegistry::new(Arc::new(source), RegistryOptions::default());

        let a = registry.get_or_create(id("A", "1.0")).await;
        let (graph, _) = registry.freeze();
        assert_eq!(graph.len(), 2);
        let b = graph.dependencies(a)[0];
        assert_eq!(graph.dependencies(b), vec![a]);
    }

    #[tokio::test]
    async fn test_concurrent_creation_looks_up_once() {
        let source = Arc::new(
            ScriptedSource::new()
                .package("Shared", "1.0", CompatibilityStatus::Compatible, &[("Leaf", "1.0")])
                .package("Leaf", "1.0", CompatibilityStatus::Compatible, &[])
                .with_delay(Duration::from_millis(20)),
        );
        let registry = NodeRegistry::new(source.clone(), RegistryOptions::default());

        let handles = join_all((0..8).map(|_| registry.get_or_create(id("Shared", "1.0")))).await;
        assert!(handles.iter().all(|h| *h == handles[0]));
        assert_eq!(source.lookups(&id("Shared", "1.0")), 1);
        assert_eq!(source.lookups(&id("Leaf", "1.0")), 1);
    }

    #[tokio::test]
    async fn test_lookups_in_flight_stay_within_concurrency() {
        let mut source = ScriptedSource::new().with_delay(Duration::from_millis(5));
        let mut roots = Vec::new();
        for project in 0..5 {
            for package in 0..8 {
                let name = format!("P{}Lib{}", project, package);
                source = source.package(&name, "1.0", CompatibilityStatus::Compatible, &[]);
                roots.push(id(&name, "1.0"));
            }
        }
        let source = Arc::new(source);
        let options = RegistryOptions {
            timeout: Duration::from_secs(5),
            concurrency: 2,
        };
        let registry = NodeRegistry::new(source.clone(), options);

        join_all(roots.into_iter().map(|root| registry.get_or_create(root))).await;
        assert_eq!(registry.len(), 40);
        assert!(source.peak_in_flight() <= 2, "peak was {}", source.peak_in_flight());
        assert!(source.peak_in_flight() >= 1);
    }
}
