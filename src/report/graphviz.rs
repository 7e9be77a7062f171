use std::fmt::Write;

use crate::engine::result::ProjectSubgraph;
use crate::engine::{InvestigationResult, NodeId};
use crate::models::CompatibilityStatus;

fn fill_color(status: CompatibilityStatus) -> &'static str {
    match status {
        CompatibilityStatus::Compatible => "palegreen",
        CompatibilityStatus::Incompatible => "lightcoral",
        CompatibilityStatus::Unknown => "lightgrey",
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn package_id(result: &InvestigationResult, id: NodeId) -> String {
    quote(&result.node(id).identity.to_string())
}

fn project_id(project: &ProjectSubgraph) -> String {
    quote(&format!("project:{}", project.name()))
}

/// Graph of every project and the packages below it.
///
/// `levels` limits how many package levels are drawn under the projects:
/// `Some(1)` shows only direct references, `None` the full global graph.
pub fn render(result: &InvestigationResult, levels: Option<usize>) -> String {
    let (nodes, edges): (Vec<NodeId>, Vec<(NodeId, NodeId)>) = match levels {
        None => (
            result.graph().nodes().map(|(id, _)| id).collect(),
            result.graph().edges().collect(),
        ),
        Some(levels) => {
            let roots = roots_of(result.projects().iter());
            result.reachable(&roots, Some(levels.saturating_sub(1)))
        }
    };
    write_graph(result, result.projects().iter(), &nodes, &edges)
}

/// Full graph of a single project.
pub fn render_project(result: &InvestigationResult, project: &ProjectSubgraph) -> String {
    let (nodes, edges) = result.reachable(&roots_of(std::iter::once(project)), None);
    write_graph(result, std::iter::once(project), &nodes, &edges)
}

fn roots_of<'a>(projects: impl Iterator<Item = &'a ProjectSubgraph>) -> Vec<NodeId> {
    projects.flat_map(|p| p.roots().iter().copied()).collect()
}

fn write_graph<'a>(
    result: &InvestigationResult,
    projects: impl Iterator<Item = &'a ProjectSubgraph> + Clone,
    nodes: &[NodeId],
    edges: &[(NodeId, NodeId)],
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "digraph dependencies {{");
    let _ = writeln!(out, "  rankdir=LR;");
    let _ = writeln!(out, "  node [shape=box, style=filled];");

    for project in projects.clone() {
        let _ = writeln!(
            out,
            "  {} [label={}, shape=folder, fillcolor=lightblue];",
            project_id(project),
            quote(project.name())
        );
    }
    for &id in nodes {
        let _ = writeln!(
            out,
            "  {} [fillcolor={}];",
            package_id(result, id),
            fill_color(result.effective(id))
        );
    }
    for project in projects {
        for &root in project.roots() {
            let _ = writeln!(out, "  {} -> {};", project_id(project), package_id(result, root));
        }
    }
    for &(from, to) in edges {
        let _ = writeln!(out, "  {} -> {};", package_id(result, from), package_id(result, to));
    }
    let _ = writeln!(out, "}}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{investigate, ScriptedSource};
    use crate::models::CompatibilityStatus::*;

    async fn sample() -> InvestigationResult {
        let source = ScriptedSource::new()
            .package("Web", "1.0", Compatible, &[("Json", "2.0")])
            .package("Json", "2.0", Incompatible, &[]);
        investigate(source, &[("App", &[("Web", "1.0")]), ("Tool", &[("Json", "2.0")])]).await
    }

    #[tokio::test]
    async fn test_full_graph_has_every_edge() {
        let result = sample().await;
        let dot = render(&result, None);
        assert!(dot.starts_with("digraph dependencies {"));
        assert!(dot.contains("\"project:App\" -> \"Web 1.0\";"));
        assert!(dot.contains("\"project:Tool\" -> \"Json 2.0\";"));
        assert!(dot.contains("\"Web 1.0\" -> \"Json 2.0\";"));
        assert!(dot.contains("\"Web 1.0\" [fillcolor=lightcoral];"));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[tokio::test]
    async fn test_one_level_graph_omits_package_edges() {
        let result = sample().await;
        let dot = render(&result, Some(1));
        assert!(dot.contains("\"project:App\" -> \"Web 1.0\";"));
        assert!(!dot.contains("\"Web 1.0\" -> \"Json 2.0\";"));
    }

    #[tokio::test]
    async fn test_project_graph_is_limited_to_project() {
        let result = sample().await;
        let tool = result.project("Tool").unwrap();
        let dot = render_project(&result, tool);
        assert!(dot.contains("\"project:Tool\""));
        assert!(!dot.contains("project:App"));
        assert!(!dot.contains("Web 1.0"));
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote(r#"a"b\c"#), r#""a\"b\\c""#);
    }
}
