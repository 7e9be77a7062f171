use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::engine::result::NodeView;
use crate::engine::InvestigationResult;
use crate::models::CompatibilityStatus;

/// Render a colored terminal report of every project's direct references.
pub fn render(result: &InvestigationResult, verbose: bool, quiet: bool) {
    let summary = result.summary();

    if quiet {
        println!(
            "Packages: {}  Compatible: {}  Unknown: {}  Incompatible: {}",
            summary.total,
            summary.compatible.to_string().green(),
            summary.unknown.to_string().yellow(),
            summary.incompatible.to_string().red(),
        );
        return;
    }

    println!(
        "\n {} v{}",
        "compat-checkr".bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(" Projects: {}\n", result.projects().len());

    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<48} │", "SUMMARY".bold());
    println!(" │  {:<48} │", format!("Distinct packages : {}", summary.total));
    println!(
        " │  {:<48} │",
        format!("{}  Compatible     : {:>4}", "✓".green(), summary.compatible)
    );
    println!(
        " │  {:<48} │",
        format!("{}  Unknown        : {:>4}", "?".yellow(), summary.unknown)
    );
    println!(
        " │  {:<48} │",
        format!("{}  Incompatible   : {:>4}", "✗".red(), summary.incompatible)
    );
    println!(" └────────────────────────────────────────────────────┘\n");

    let rows = rows(result);

    if rows.iter().any(|(_, v)| v.effective == CompatibilityStatus::Incompatible) {
        println!(" {} Packages blocking the migration:\n", "[INCOMPATIBLE]".red().bold());
        render_table(&rows, CompatibilityStatus::Incompatible);
        println!();
    }

    if rows.iter().any(|(_, v)| v.effective == CompatibilityStatus::Unknown) {
        println!(" {} Packages needing manual verification:\n", "[UNKNOWN]".yellow().bold());
        render_table(&rows, CompatibilityStatus::Unknown);
        println!();
    }

    if verbose && rows.iter().any(|(_, v)| v.effective == CompatibilityStatus::Compatible) {
        println!(" {} Compatible packages:\n", "[COMPATIBLE]".green().bold());
        render_table(&rows, CompatibilityStatus::Compatible);
        println!();
    }

    let diagnostics = result.diagnostics();
    if !diagnostics.is_empty() {
        println!(" {} {} diagnostic(s) recorded", "[NOTE]".cyan().bold(), diagnostics.len());
        if verbose {
            for d in diagnostics {
                let project = d.project.as_deref().unwrap_or("-");
                println!("   {} [{}] {}", project.dimmed(), d.kind, d.message);
            }
        }
        println!();
    }
}

/// `(project, package)` pairs in project then manifest order.
fn rows(result: &InvestigationResult) -> Vec<(&str, NodeView)> {
    result
        .projects()
        .iter()
        .flat_map(|p| {
            result
                .top_level(p)
                .into_iter()
                .map(move |view| (p.name(), view))
        })
        .collect()
}

fn status_cell(status: CompatibilityStatus) -> Cell {
    let (label, color) = match status {
        CompatibilityStatus::Compatible => ("✓ compatible", Color::Green),
        CompatibilityStatus::Unknown => ("? unknown", Color::Yellow),
        CompatibilityStatus::Incompatible => ("✗ incompatible", Color::Red),
    };
    Cell::new(label).fg(color).set_alignment(CellAlignment::Center)
}

fn render_table(rows: &[(&str, NodeView)], filter: CompatibilityStatus) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Project").add_attribute(Attribute::Bold),
            Cell::new("Package").add_attribute(Attribute::Bold),
            Cell::new("Version").add_attribute(Attribute::Bold),
            Cell::new("Own").add_attribute(Attribute::Bold),
            Cell::new("Effective").add_attribute(Attribute::Bold),
        ]);

    for (project, view) in rows.iter().filter(|(_, v)| v.effective == filter) {
        table.add_row(vec![
            Cell::new(project),
            Cell::new(&view.identity.name),
            Cell::new(&view.identity.version),
            status_cell(view.own),
            status_cell(view.effective),
        ]);
    }

    println!("{}", table);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{investigate, ScriptedSource};
    use crate::models::CompatibilityStatus::*;

    #[tokio::test]
    async fn test_rows_follow_project_and_manifest_order() {
        let source = ScriptedSource::new()
            .package("B", "1.0", Compatible, &[])
            .package("A", "1.0", Incompatible, &[]);
        let result = investigate(
            source,
            &[("First", &[("B", "1.0"), ("A", "1.0")]), ("Second", &[("A", "1.0")])],
        )
        .await;

        let rows = rows(&result);
        let flat: Vec<_> = rows
            .iter()
            .map(|(p, v)| (*p, v.identity.name.as_str(), v.effective))
            .collect();
        assert_eq!(
            flat,
            vec![
                ("First", "B", Compatible),
                ("First", "A", Incompatible),
                ("Second", "A", Incompatible),
            ]
        );
    }
}
