//! `compat-checkr` — scan NuGet manifests and find which dependencies block a
//! move to another runtime platform.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]).
//! 2. Load config ([`config::load_config`]) and start logging ([`logging`]).
//! 3. Find project manifests under the scan directories ([`scanner`], [`manifest`]).
//! 4. Assemble the metadata source stack ([`metadata`]).
//! 5. Build the shared dependency graph and propagate compatibility ([`engine`]).
//! 6. Write the report files and print the requested report ([`report`]).
//! 7. Exit `0` (report written), `1` (usage error) or `2` (run failed).

mod cli;
mod config;
mod engine;
mod error;
mod logging;
mod manifest;
mod metadata;
mod models;
mod report;
mod scanner;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use colored::Colorize;

use cli::{Cli, ReportFormat};
use config::{load_config, Config};
use engine::{Investigator, ReportDocument};
use manifest::dotnet::DotNetReader;
use metadata::catalog::CatalogSource;
use metadata::nuget::NugetSource;
use metadata::overrides::OverrideSource;
use metadata::{LayeredSource, MetadataSource};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    logging::init(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "investigation failed");
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let dirs: Vec<_> = cli
        .dirs
        .iter()
        .map(|d| d.canonicalize().unwrap_or_else(|_| d.clone()))
        .collect();

    let mut config = load_config(&dirs[0], cli.config.as_deref())?;
    if let Some(timeout) = cli.timeout {
        config.lookup.timeout_secs = timeout;
    }

    let manifests = scanner::find_manifests(&dirs, &config.scan.exclude, &DotNetReader::new())?;
    if manifests.is_empty() {
        let searched: Vec<_> = dirs.iter().map(|d| d.display().to_string()).collect();
        bail!("no supported project manifests found in {}", searched.join(", "));
    }

    if !cli.quiet {
        for m in &manifests {
            eprintln!(
                "  {} {} {} packages",
                "→".cyan(),
                m.name,
                m.entries.len()
            );
        }
    }

    let source = build_source(&cli, &config)?;
    let show_progress = !cli.quiet && matches!(cli.report, ReportFormat::Terminal);
    let result = Investigator::new(source, config.lookup.registry_options())
        .with_progress(show_progress)
        .investigate(&manifests)
        .await?;

    report::output::write_all(&cli.output, &result)?;

    match cli.report {
        ReportFormat::Terminal => report::terminal::render(&result, cli.verbose > 0, cli.quiet),
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&ReportDocument::from(&result))?);
        }
        ReportFormat::None => {}
    }

    if !cli.quiet {
        eprintln!(
            "{}",
            format!("Output written to {}", cli.output.display()).magenta()
        );
    }

    Ok(())
}

/// Catalog first, then the NuGet registry, with config overrides on top.
fn build_source(cli: &Cli, config: &Config) -> Result<Arc<dyn MetadataSource>> {
    let mut layers: Vec<Box<dyn MetadataSource>> = Vec::new();

    if let Some(path) = &cli.catalog {
        let catalog = CatalogSource::load(path)?;
        tracing::info!(packages = catalog.len(), path = %path.display(), "loaded catalog");
        layers.push(Box::new(catalog));
    }

    if cli.online {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.lookup.timeout_secs.max(1)))
            .build()?;
        layers.push(Box::new(NugetSource::new(client, &config.target.frameworks)));
    }

    if layers.is_empty() {
        tracing::warn!("no metadata source selected (--online or --catalog); packages without an override will be unknown");
    }

    // Overridden packages settle before the registry's own lookup timeout.
    let dependency_timeout = config.lookup.registry_options().timeout / 2;
    let layered = LayeredSource::new(layers);
    Ok(Arc::new(
        OverrideSource::new(Box::new(layered), &config.overrides)
            .with_dependency_timeout(dependency_timeout),
    ))
}
