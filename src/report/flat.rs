use std::fmt::Write;

use crate::engine::InvestigationResult;

/// One line per distinct package referenced directly by any project, sorted
/// by name then version: `name version status`.
pub fn render(result: &InvestigationResult) -> String {
    let mut views: Vec<_> = result
        .distinct_top_level()
        .into_iter()
        .map(|id| result.view(id))
        .collect();
    views.sort_by(|a, b| a.identity.cmp(&b.identity));

    let mut out = String::new();
    for view in views {
        let _ = writeln!(
            out,
            "{} {} {}",
            view.identity.name, view.identity.version, view.effective
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{investigate, ScriptedSource};
    use crate::models::CompatibilityStatus::*;

    #[tokio::test]
    async fn test_flat_listing_is_sorted_and_distinct() {
        let source = ScriptedSource::new()
            .package("Zed", "1.0", Compatible, &[])
            .package("Alpha", "2.0", Compatible, &[("Gone", "1.0")]);
        let result = investigate(
            source,
            &[("A", &[("Zed", "1.0"), ("Alpha", "2.0")]), ("B", &[("Zed", "1.0")])],
        )
        .await;

        assert_eq!(render(&result), "Alpha 2.0 unknown\nZed 1.0 compatible\n");
    }
}
