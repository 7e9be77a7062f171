use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::graph::{DependencyGraph, NodeId};
use crate::models::CompatibilityStatus;

/// Computes effective compatibility over a built [`DependencyGraph`].
///
/// A node is Incompatible when it or anything it reaches is Incompatible,
/// otherwise Unknown when it or anything it reaches is Unknown, otherwise
/// Compatible.
///
/// Traversal is an explicit depth-first walk (Tarjan's strongly connected
/// components) with an in-progress marker per node, so cycles neither
/// recurse forever nor overflow the stack. A dependency met again while it
/// is still in progress contributes Unknown. All members of a cycle are
/// finalised together with one status, which keeps results independent of
/// the order nodes are visited in. Finalised statuses are memoised on the
/// nodes and never recomputed.
pub struct Propagator<'a> {
    graph: &'a DependencyGraph,
}

struct Frame {
    node: NodeId,
    dependencies: Vec<NodeId>,
    next: usize,
}

#[derive(Default)]
struct Walk {
    counter: usize,
    index: HashMap<NodeId, usize>,
    lowlink: HashMap<NodeId, usize>,
    in_progress: HashSet<NodeId>,
    stack: Vec<NodeId>,
    frames: Vec<Frame>,
}

impl<'a> Propagator<'a> {
    pub fn new(graph: &'a DependencyGraph) -> Self {
        Self { graph }
    }

    /// Resolve every node in the graph.
    pub fn resolve_all(&self) {
        for (id, _) in self.graph.nodes() {
            self.resolve_effective(id);
        }
    }

    /// Effective status of `node`, computing it (and everything it reaches)
    /// on first request.
    pub fn resolve_effective(&self, node: NodeId) -> CompatibilityStatus {
        if let Some(status) = self.graph.node(node).effective() {
            return status;
        }

        let mut walk = Walk::default();
        self.enter(&mut walk, node);

        while let Some(frame) = walk.frames.last_mut() {
            if frame.next < frame.dependencies.len() {
                let current = frame.node;
                let dependency = frame.dependencies[frame.next];
                frame.next += 1;

                if self.graph.node(dependency).effective().is_some() {
                    continue;
                }
                if !walk.index.contains_key(&dependency) {
                    self.enter(&mut walk, dependency);
                } else if walk.in_progress.contains(&dependency) {
                    let seen = walk.index[&dependency];
                    if let Some(low) = walk.lowlink.get_mut(&current) {
                        *low = (*low).min(seen);
                    }
                }
                continue;
            }

            let Some(done) = walk.frames.pop() else {
                break;
            };
            let low = walk.lowlink[&done.node];
            if let Some(parent) = walk.frames.last() {
                if let Some(parent_low) = walk.lowlink.get_mut(&parent.node) {
                    *parent_low = (*parent_low).min(low);
                }
            }

            if low == walk.index[&done.node] {
                let mut component = Vec::new();
                while let Some(member) = walk.stack.pop() {
                    walk.in_progress.remove(&member);
                    component.push(member);
                    if member == done.node {
                        break;
                    }
                }
                self.finalize_component(&component);
            }
        }

        self.graph
            .node(node)
            .effective()
            .unwrap_or(CompatibilityStatus::Unknown)
    }

    fn enter(&self, walk: &mut Walk, node: NodeId) {
        walk.index.insert(node, walk.counter);
        walk.lowlink.insert(node, walk.counter);
        walk.counter += 1;
        walk.stack.push(node);
        walk.in_progress.insert(node);
        walk.frames.push(Frame {
            node,
            dependencies: self.graph.dependencies(node),
            next: 0,
        });
    }

    /// Every dependency leaving the component is already final when a
    /// component is popped, so one pass decides the shared status.
    fn finalize_component(&self, component: &[NodeId]) {
        let cyclic = component.len() > 1 || self.graph.has_self_edge(component[0]);
        let mut status = if cyclic {
            CompatibilityStatus::Unknown
        } else {
            CompatibilityStatus::Compatible
        };

        let members: HashSet<NodeId> = component.iter().copied().collect();
        for &member in component {
            status = status.combine(self.graph.node(member).own);
            for dependency in self.graph.dependencies(member) {
                if members.contains(&dependency) {
                    continue;
                }
                let dep_status = self
                    .graph
                    .node(dependency)
                    .effective()
                    .unwrap_or(CompatibilityStatus::Unknown);
                status = status.combine(dep_status);
            }
        }

        if cyclic {
            debug!(
                members = component.len(),
                %status,
                "dependency cycle resolved"
            );
        }
        for &member in component {
            self.graph.node(member).finalize(status);
        }
    }
}
