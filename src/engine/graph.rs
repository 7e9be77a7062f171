use std::sync::OnceLock;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::models::{CompatibilityStatus, PackageIdentity};

/// Handle of a node in the [`DependencyGraph`] arena.
pub type NodeId = NodeIndex;

/// One package version, shared by every project that references it.
#[derive(Debug)]
pub struct GraphNode {
    pub identity: PackageIdentity,
    /// Status reported by the metadata source for this package alone.
    pub own: CompatibilityStatus,
    effective: OnceLock<CompatibilityStatus>,
}

impl GraphNode {
    pub(crate) fn new(identity: PackageIdentity, own: CompatibilityStatus) -> Self {
        Self {
            identity,
            own,
            effective: OnceLock::new(),
        }
    }

    /// Effective status, once propagation has reached this node.
    pub fn effective(&self) -> Option<CompatibilityStatus> {
        self.effective.get().copied()
    }

    /// Set-once; later calls keep the first value.
    pub(crate) fn finalize(&self, status: CompatibilityStatus) {
        let _ = self.effective.set(status);
    }
}

/// The deduplicated dependency graph of a whole investigation.
///
/// Edges point from a package to its direct dependencies. The graph may
/// contain cycles. Apart from the set-once effective status memo, it is
/// immutable once built.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<GraphNode, ()>,
}

impl DependencyGraph {
    /// Assemble the graph from build-phase slots. Slot `i` becomes node `i`.
    pub(crate) fn from_slots(
        slots: impl IntoIterator<Item = (PackageIdentity, CompatibilityStatus, Vec<NodeId>)>,
    ) -> Self {
        let mut graph = DiGraph::new();
        let mut edges = Vec::new();

        for (identity, own, dependencies) in slots {
            let id = graph.add_node(GraphNode::new(identity, own));
            edges.extend(dependencies.into_iter().map(|dep| (id, dep)));
        }
        for (from, to) in edges {
            graph.add_edge(from, to, ());
        }

        Self { graph }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn node(&self, id: NodeId) -> &GraphNode {
        &self.graph[id]
    }

    /// All nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &GraphNode)> {
        self.graph
            .node_indices()
            .map(move |id| (id, &self.graph[id]))
    }

    /// Direct dependencies of `id`, in the order the metadata listed them.
    pub fn dependencies(&self, id: NodeId) -> Vec<NodeId> {
        let mut edges: Vec<_> = self.graph.edges(id).map(|e| (e.id(), e.target())).collect();
        edges.sort_by_key(|(edge, _)| *edge);
        edges.into_iter().map(|(_, target)| target).collect()
    }

    /// Every `(package, dependency)` edge, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.graph
            .edge_indices()
            .filter_map(move |e| self.graph.edge_endpoints(e))
    }

    pub fn has_self_edge(&self, id: NodeId) -> bool {
        self.graph.contains_edge(id, id)
    }

    pub(crate) fn inner(&self) -> &DiGraph<GraphNode, ()> {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependencies_keep_metadata_order() {
        let slots = vec![
            (
                PackageIdentity::new("Root", "1.0"),
                CompatibilityStatus::Compatible,
                vec![NodeIndex::new(2), NodeIndex::new(1), NodeIndex::new(3)],
            ),
            (PackageIdentity::new("B", "1.0"), CompatibilityStatus::Compatible, vec![]),
            (PackageIdentity::new("A", "1.0"), CompatibilityStatus::Compatible, vec![]),
            (PackageIdentity::new("C", "1.0"), CompatibilityStatus::Compatible, vec![]),
        ];
        let graph = DependencyGraph::from_slots(slots);

        let root = NodeIndex::new(0);
        let names: Vec<_> = graph
            .dependencies(root)
            .into_iter()
            .map(|id| graph.node(id).identity.name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(graph.edges().count(), 3);
    }

    #[test]
    fn test_finalize_is_set_once() {
        let node = GraphNode::new(PackageIdentity::new("A", "1.0"), CompatibilityStatus::Compatible);
        assert_eq!(node.effective(), None);
        node.finalize(CompatibilityStatus::Unknown);
        node.finalize(CompatibilityStatus::Compatible);
        assert_eq!(node.effective(), Some(CompatibilityStatus::Unknown));
    }
}
