use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, warn};

use crate::manifest::ManifestReader;
use crate::models::ProjectManifest;

/// Walk `roots` and read one [`ProjectManifest`] per directory holding a
/// manifest `reader` understands.
///
/// Directories whose name is in `exclude` (case-insensitive) are skipped
/// together with everything below them, roots included. Symlinked
/// directories are not followed. The walk is depth-first with children in
/// name order, so the project order is stable between runs. A project whose
/// manifest cannot be read is logged and left out; the walk goes on.
pub fn find_manifests(
    roots: &[PathBuf],
    exclude: &[String],
    reader: &dyn ManifestReader,
) -> Result<Vec<ProjectManifest>> {
    let exclude: HashSet<String> = exclude.iter().map(|e| e.to_lowercase()).collect();
    let mut manifests = Vec::new();

    for root in roots {
        let mut stack = vec![root.clone()];
        while let Some(dir) = stack.pop() {
            if is_excluded(&dir, &exclude) {
                debug!(dir = %dir.display(), "excluded");
                continue;
            }

            if reader.detect(&dir) {
                match reader.read(&dir) {
                    Ok(entries) => {
                        debug!(dir = %dir.display(), entries = entries.len(), "found manifest");
                        manifests.push(
                            ProjectManifest::new(project_name(&dir), entries).with_path(dir.clone()),
                        );
                    }
                    Err(e) => {
                        warn!(dir = %dir.display(), error = %format!("{:#}", e), "unreadable manifest, project skipped");
                    }
                }
            }

            let mut children = match subdirectories(&dir) {
                Ok(children) => children,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "cannot list directory");
                    continue;
                }
            };
            children.sort();
            stack.extend(children.into_iter().rev());
        }
    }

    Ok(manifests)
}

fn is_excluded(dir: &Path, exclude: &HashSet<String>) -> bool {
    dir.file_name()
        .and_then(|n| n.to_str())
        .map(|n| exclude.contains(&n.to_lowercase()))
        .unwrap_or(false)
}

fn subdirectories(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    Ok(dirs)
}

fn project_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}
