use std::collections::{BTreeSet, HashSet, VecDeque};

use serde::Serialize;

use super::graph::{DependencyGraph, GraphNode, NodeId};
use crate::models::{CompatibilityStatus, Diagnostic, PackageIdentity};

/// One project's direct references into the shared graph, in manifest order.
#[derive(Debug, Clone)]
pub struct ProjectSubgraph {
    name: String,
    roots: Vec<NodeId>,
}

impl ProjectSubgraph {
    pub fn new(name: impl Into<String>, roots: Vec<NodeId>) -> Self {
        Self {
            name: name.into(),
            roots,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }
}

/// A node as seen by renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeView {
    #[serde(flatten)]
    pub identity: PackageIdentity,
    pub own: CompatibilityStatus,
    pub effective: CompatibilityStatus,
}

/// Counts of distinct packages per effective status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub compatible: usize,
    pub unknown: usize,
    pub incompatible: usize,
}

/// The outcome of one investigation: every project's subgraph over one
/// shared, fully propagated dependency graph.
///
/// Read-only; renderers consume it through `&self` and may do so from
/// several threads at once.
#[derive(Debug)]
pub struct InvestigationResult {
    projects: Vec<ProjectSubgraph>,
    graph: DependencyGraph,
    diagnostics: Vec<Diagnostic>,
}

impl InvestigationResult {
    pub(crate) fn new(
        projects: Vec<ProjectSubgraph>,
        graph: DependencyGraph,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        Self {
            projects,
            graph,
            diagnostics,
        }
    }

    /// Projects in input order.
    pub fn projects(&self) -> &[ProjectSubgraph] {
        &self.projects
    }

    #[cfg(test)]
    pub fn project(&self, name: &str) -> Option<&ProjectSubgraph> {
        self.projects.iter().find(|p| p.name == name)
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn node(&self, id: NodeId) -> &GraphNode {
        self.graph.node(id)
    }

    /// Effective status of a node. Unknown if propagation never reached it.
    pub fn effective(&self, id: NodeId) -> CompatibilityStatus {
        self.graph
            .node(id)
            .effective()
            .unwrap_or(CompatibilityStatus::Unknown)
    }

    pub fn view(&self, id: NodeId) -> NodeView {
        let node = self.graph.node(id);
        NodeView {
            identity: node.identity.clone(),
            own: node.own,
            effective: self.effective(id),
        }
    }

    /// The project's direct references with their statuses, in manifest order.
    pub fn top_level(&self, project: &ProjectSubgraph) -> Vec<NodeView> {
        project.roots.iter().map(|id| self.view(*id)).collect()
    }

    /// Nodes reachable from `roots` (roots included) together with the edges
    /// between them, breadth first. With `max_depth = Some(n)` only
    /// dependencies up to `n` hops below a root are followed.
    pub fn reachable(&self, roots: &[NodeId], max_depth: Option<usize>) -> (Vec<NodeId>, Vec<(NodeId, NodeId)>) {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut edges = Vec::new();
        let mut queue = VecDeque::new();

        for &root in roots {
            if seen.insert(root) {
                order.push(root);
                queue.push_back((root, 0));
            }
        }

        while let Some((id, depth)) = queue.pop_front() {
            if max_depth.is_some_and(|max| depth >= max) {
                continue;
            }
            for dep in self.graph.dependencies(id) {
                edges.push((id, dep));
                if seen.insert(dep) {
                    order.push(dep);
                    queue.push_back((dep, depth + 1));
                }
            }
        }

        (order, edges)
    }

    /// Distinct top-level references across every project.
    pub fn distinct_top_level(&self) -> Vec<NodeId> {
        let ids: BTreeSet<NodeId> = self
            .projects
            .iter()
            .flat_map(|p| p.roots.iter().copied())
            .collect();
        ids.into_iter().collect()
    }

    /// Status counts over every distinct node in the graph.
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for (id, _) in self.graph.nodes() {
            summary.total += 1;
            match self.effective(id) {
                CompatibilityStatus::Compatible => summary.compatible += 1,
                CompatibilityStatus::Unknown => summary.unknown += 1,
                CompatibilityStatus::Incompatible => summary.incompatible += 1,
            }
        }
        summary
    }
}

/// Serialisable snapshot of a result, for the JSON report.
#[derive(Debug, Serialize)]
pub struct ReportDocument {
    pub summary: Summary,
    pub projects: Vec<ProjectReport>,
    pub packages: Vec<PackageReport>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Serialize)]
pub struct ProjectReport {
    pub name: String,
    pub dependencies: Vec<NodeView>,
}

#[derive(Debug, Serialize)]
pub struct PackageReport {
    #[serde(flatten)]
    pub node: NodeView,
    pub dependencies: Vec<PackageIdentity>,
}

impl From<&InvestigationResult> for ReportDocument {
    fn from(result: &InvestigationResult) -> Self {
        let projects = result
            .projects()
            .iter()
            .map(|p| ProjectReport {
                name: p.name().to_string(),
                dependencies: result.top_level(p),
            })
            .collect();

        let packages = result
            .graph()
            .nodes()
            .map(|(id, _)| PackageReport {
                node: result.view(id),
                dependencies: result
                    .graph()
                    .dependencies(id)
                    .into_iter()
                    .map(|dep| result.node(dep).identity.clone())
                    .collect(),
            })
            .collect();

        ReportDocument {
            summary: result.summary(),
            projects,
            packages,
            diagnostics: result.diagnostics().to_vec(),
        }
    }
}
