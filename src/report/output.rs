use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::{flat, graphviz, tree};
use crate::engine::InvestigationResult;

/// Write the report file set into `dir`, creating it if needed:
///
/// - `Flat.txt` — flat listing
/// - `Tree.txt` — per-project trees
/// - `1Level.gv` — graph of direct references only
/// - `All.gv` — full graph
/// - `<project>.gv` — one graph per project
///
/// Returns the paths written, in that order.
pub fn write_all(dir: &Path, result: &InvestigationResult) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut files = vec![
        ("Flat.txt".to_string(), flat::render(result)),
        ("Tree.txt".to_string(), tree::render(result)),
        ("1Level.gv".to_string(), graphviz::render(result, Some(1))),
        ("All.gv".to_string(), graphviz::render(result, None)),
    ];

    let mut taken: HashSet<String> = files.iter().map(|(name, _)| name.to_lowercase()).collect();
    for project in result.projects() {
        let name = unique_file_name(&sanitize(project.name()), &mut taken);
        files.push((name, graphviz::render_project(result, project)));
    }

    let mut written = Vec::with_capacity(files.len());
    for (name, content) in files {
        let path = dir.join(name);
        std::fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

/// Replace characters that are unsafe in file names.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if cleaned.trim().is_empty() {
        "project".to_string()
    } else {
        cleaned
    }
}

/// `<stem>.gv`, or `<stem>-2.gv`, `<stem>-3.gv`, ... when already taken.
/// Comparison is case-insensitive so the names also work on such filesystems.
fn unique_file_name(stem: &str, taken: &mut HashSet<String>) -> String {
    let mut candidate = format!("{}.gv", stem);
    let mut n = 2;
    while !taken.insert(candidate.to_lowercase()) {
        candidate = format!("{}-{}.gv", stem, n);
        n += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{investigate, ScriptedSource};
    use crate::models::CompatibilityStatus::*;

    #[tokio::test]
    async fn test_writes_every_file() {
        let source = ScriptedSource::new().package("Lib", "1.0", Compatible, &[]);
        let result = investigate(
            source,
            &[("App", &[("Lib", "1.0")]), ("app", &[]), ("All", &[("Lib", "1.0")])],
        )
        .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("report");
        let written = write_all(&out, &result).unwrap();

        let names: Vec<_> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["Flat.txt", "Tree.txt", "1Level.gv", "All.gv", "App.gv", "app-2.gv", "All-2.gv"]
        );
        let flat = std::fs::read_to_string(out.join("Flat.txt")).unwrap();
        assert_eq!(flat, "Lib 1.0 compatible\n");
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("a/b:c"), "a_b_c");
        assert_eq!(sanitize("  "), "project");
    }
}
