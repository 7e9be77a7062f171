use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use tracing::warn;

use crate::models::ManifestEntry;

/// Reader for NuGet manifests.
///
/// Supports three formats:
/// - Legacy `packages.config` (`<package>` elements)
/// - SDK-style `*.csproj` / `*.fsproj` (`<PackageReference>` elements, with
///   the version as an attribute or a child element)
/// - `paket.lock` (NUGET section entries)
///
/// Only files directly inside the directory are read.
pub struct DotNetReader;

impl DotNetReader {
    pub fn new() -> Self {
        Self
    }

    fn project_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .flatten()
                    .map(|e| e.path())
                    .filter(|p| {
                        p.is_file()
                            && matches!(
                                p.extension().and_then(|s| s.to_str()),
                                Some("csproj" | "fsproj")
                            )
                    })
                    .collect()
            })
            .unwrap_or_default();
        files.sort();
        files
    }
}

impl super::ManifestReader for DotNetReader {
    fn detect(&self, dir: &Path) -> bool {
        dir.join("packages.config").is_file()
            || dir.join("paket.lock").is_file()
            || !Self::project_files(dir).is_empty()
    }

    fn read(&self, dir: &Path) -> Result<Vec<ManifestEntry>> {
        let mut entries = Vec::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut push_all = |parsed: Vec<ManifestEntry>| {
            for e in parsed {
                if seen.insert((e.name.clone(), e.version.clone())) {
                    entries.push(e);
                }
            }
        };

        let packages_config = dir.join("packages.config");
        if packages_config.is_file() {
            push_all(parse_packages_config(&packages_config)?);
        }

        for project_file in Self::project_files(dir) {
            match parse_project_file(&project_file) {
                Ok(parsed) => push_all(parsed),
                Err(e) => warn!(path = %project_file.display(), error = %format!("{:#}", e), "unreadable project file, skipped"),
            }
        }

        let paket_lock = dir.join("paket.lock");
        if paket_lock.is_file() {
            push_all(parse_paket_lock(&paket_lock)?);
        }

        Ok(entries)
    }
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Option<String> {
    e.attributes().flatten().find_map(|attr| {
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        if key.eq_ignore_ascii_case(name) {
            Some(attr.unescape_value().unwrap_or_default().into_owned())
        } else {
            None
        }
    })
}

/// Parse `<package id="..." version="..." />` from `packages.config`.
///
/// Every `<package>` element yields an entry, even with a missing id or
/// version, so the engine can report it.
fn parse_packages_config(path: &Path) -> Result<Vec<ManifestEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                if e.name().local_name().as_ref() == b"package" {
                    entries.push(ManifestEntry::new(
                        attribute(e, "id").unwrap_or_default(),
                        attribute(e, "version").unwrap_or_default(),
                    ));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(e).with_context(|| format!("parsing {}", path.display()));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(entries)
}

/// Parse `<PackageReference Include="..." Version="..." />` from `.csproj` /
/// `.fsproj`, also accepting `<Version>` as a child element.
fn parse_project_file(path: &Path) -> Result<Vec<ManifestEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    let mut entries: Vec<ManifestEntry> = Vec::new();
    let mut buf = Vec::new();
    // Index of the PackageReference whose children are being read.
    let mut open_reference: Option<usize> = None;
    let mut in_version = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) if e.name().local_name().as_ref() == b"PackageReference" => {
                if let Some(name) = attribute(e, "Include") {
                    entries.push(ManifestEntry::new(name, attribute(e, "Version").unwrap_or_default()));
                }
            }
            Ok(Event::Start(ref e)) => match e.name().local_name().as_ref() {
                b"PackageReference" => {
                    if let Some(name) = attribute(e, "Include") {
                        entries.push(ManifestEntry::new(name, attribute(e, "Version").unwrap_or_default()));
                        open_reference = Some(entries.len() - 1);
                    }
                }
                b"Version" if open_reference.is_some() => in_version = true,
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_version => {
                if let (Some(i), Ok(text)) = (open_reference, e.unescape()) {
                    if entries[i].version.is_empty() {
                        entries[i].version = text.trim().to_string();
                    }
                }
            }
            Ok(Event::End(ref e)) => match e.name().local_name().as_ref() {
                b"PackageReference" => open_reference = None,
                b"Version" => in_version = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(e).with_context(|| format!("parsing {}", path.display()));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(entries)
}

/// Parse `paket.lock`: NUGET section entries like `    PackageName (1.2.3)`.
///
/// Only the four-space indented lines are packages; deeper lines list their
/// dependencies, which come from metadata instead.
fn parse_paket_lock(path: &Path) -> Result<Vec<ManifestEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let re = Regex::new(r"^\s{4}(\S+)\s+\(([^)]+)\)")?;
    let mut entries = Vec::new();
    let mut in_nuget = false;

    for line in content.lines() {
        if line.trim_end() == "NUGET" {
            in_nuget = true;
            continue;
        }
        if !line.starts_with(' ') && !line.is_empty() {
            in_nuget = false;
        }
        if in_nuget {
            if let Some(caps) = re.captures(line) {
                entries.push(ManifestEntry::new(&caps[1], &caps[2]));
            }
        }
    }

    Ok(entries)
}
