use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::engine::RegistryOptions;
use crate::models::CompatibilityStatus;

/// Root configuration structure, deserialized from `.compat-checkr/config.toml`.
///
/// Every section is optional; missing sections take their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub target: TargetConfig,
    pub scan: ScanConfig,
    pub lookup: LookupConfig,
    /// Forced statuses keyed by package name (any version, case-insensitive).
    pub overrides: HashMap<String, CompatibilityStatus>,
}

/// The platform packages are checked against.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Target framework prefixes that count as compatible
    /// (`netstandard` matches `netstandard1.3`, `.NETStandard2.0`, ...).
    pub frameworks: Vec<String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        let frameworks = [
            "netstandard",
            "netcoreapp",
            "net5.0",
            "net6.0",
            "net7.0",
            "net8.0",
            "net9.0",
        ];
        Self {
            frameworks: frameworks.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Directory traversal rules.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Directory names never descended into (case-insensitive).
    pub exclude: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            exclude: vec![
                "node_modules".to_string(),
                "bower_components".to_string(),
                "packages".to_string(),
            ],
        }
    }
}

/// Metadata lookup limits.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Seconds before a single lookup is abandoned and treated as Unknown.
    pub timeout_secs: u64,
    /// Lookups kept in flight per resolving task.
    pub concurrency: usize,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            concurrency: 16,
        }
    }
}

impl LookupConfig {
    pub fn registry_options(&self) -> RegistryOptions {
        RegistryOptions {
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
            concurrency: self.concurrency.max(1),
        }
    }
}

/// Load the configuration, searching in order:
///
/// 1. `config_override` — path passed via `--config`
/// 2. `<project_path>/.compat-checkr/config.toml`
/// 3. `~/.config/compat-checkr/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(project_path: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let project_config = project_path.join(".compat-checkr").join("config.toml");
    if project_config.exists() {
        return read_config(&project_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home
            .join(".config")
            .join("compat-checkr")
            .join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert!(cfg.target.frameworks.contains(&"netstandard".to_string()));
        assert_eq!(cfg.scan.exclude.len(), 3);
        assert_eq!(cfg.lookup.timeout_secs, 10);
        assert!(cfg.overrides.is_empty());
    }

    #[test]
    fn test_partial_config_keeps_other_defaults() {
        let cfg: Config = toml::from_str(
            r#"
[lookup]
timeout_secs = 3

[overrides]
"Newtonsoft.Json" = "compatible"
"Legacy.Thing" = "incompatible"
"#,
        )
        .unwrap();
        assert_eq!(cfg.lookup.timeout_secs, 3);
        assert_eq!(cfg.lookup.concurrency, 16);
        assert_eq!(cfg.scan.exclude.len(), 3);
        assert_eq!(
            cfg.overrides.get("Legacy.Thing"),
            Some(&CompatibilityStatus::Incompatible)
        );
    }

    #[test]
    fn test_registry_options_clamp_zero() {
        let lookup = LookupConfig {
            timeout_secs: 0,
            concurrency: 0,
        };
        let options = lookup.registry_options();
        assert_eq!(options.timeout, Duration::from_secs(1));
        assert_eq!(options.concurrency, 1);
    }

    #[test]
    fn test_project_config_is_found() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(".compat-checkr");
        std::fs::create_dir(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("config.toml"),
            "[target]\nframeworks = [\"netstandard2.0\"]\n",
        )
        .unwrap();

        let cfg = load_config(dir.path(), None).unwrap();
        assert_eq!(cfg.target.frameworks, vec!["netstandard2.0".to_string()]);
    }

    #[test]
    fn test_override_path_errors_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = load_config(dir.path(), Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("nope.toml"));
    }
}
