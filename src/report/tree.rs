use std::collections::HashSet;
use std::fmt::Write;

use crate::engine::{InvestigationResult, NodeId};

const INDENT: &str = "  ";

/// Indented dependency tree for every project, in project order.
///
/// Within one project a package is expanded the first time it appears;
/// later occurrences are marked `(see above)`, which also cuts cycles.
pub fn render(result: &InvestigationResult) -> String {
    let mut out = String::new();
    for project in result.projects() {
        let _ = writeln!(out, "{}", project.name());
        let mut expanded: HashSet<NodeId> = HashSet::new();
        // (node, depth) pairs; children are pushed in reverse to print in order.
        let mut stack: Vec<(NodeId, usize)> = project.roots().iter().rev().map(|id| (*id, 1)).collect();

        while let Some((id, depth)) = stack.pop() {
            let view = result.view(id);
            let first_visit = expanded.insert(id);
            let dependencies = result.graph().dependencies(id);
            let marker = if !first_visit && !dependencies.is_empty() {
                " (see above)"
            } else {
                ""
            };
            let _ = writeln!(
                out,
                "{}{} {} [{}]{}",
                INDENT.repeat(depth),
                view.identity.name,
                view.identity.version,
                view.effective,
                marker
            );

            if first_visit {
                stack.extend(dependencies.into_iter().rev().map(|dep| (dep, depth + 1)));
            }
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{investigate, ScriptedSource};
    use crate::models::CompatibilityStatus::*;

    #[tokio::test]
    async fn test_tree_nests_dependencies() {
        let source = ScriptedSource::new()
            .package("Web", "1.0", Compatible, &[("Json", "2.0"), ("Log", "1.0")])
            .package("Json", "2.0", Compatible, &[])
            .package("Log", "1.0", Incompatible, &[]);
        let result = investigate(source, &[("App", &[("Web", "1.0")])]).await;

        let expected = "App\n  Web 1.0 [incompatible]\n    Json 2.0 [compatible]\n    Log 1.0 [incompatible]\n\n";
        assert_eq!(render(&result), expected);
    }

    #[tokio::test]
    async fn test_tree_cuts_cycles() {
        let source = ScriptedSource::new()
            .package("A", "1.0", Compatible, &[("B", "1.0")])
            .package("B", "1.0", Compatible, &[("A", "1.0")]);
        let result = investigate(source, &[("App", &[("A", "1.0")])]).await;

        let expected = "App\n  A 1.0 [unknown]\n    B 1.0 [unknown]\n      A 1.0 [unknown] (see above)\n\n";
        assert_eq!(render(&result), expected);
    }
}
