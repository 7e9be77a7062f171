use std::sync::Arc;

use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use petgraph::algo::tarjan_scc;
use tracing::info;

use super::builder::GraphBuilder;
use super::graph::DependencyGraph;
use super::propagator::Propagator;
use super::registry::{NodeRegistry, RegistryOptions};
use super::result::InvestigationResult;
use crate::error::InvestigationError;
use crate::metadata::MetadataSource;
use crate::models::{Diagnostic, DiagnosticKind, ProjectManifest};

/// Runs a whole investigation: concurrent graph building over one shared
/// registry, then a single propagation pass.
pub struct Investigator {
    source: Arc<dyn MetadataSource>,
    options: RegistryOptions,
    show_progress: bool,
}

impl Investigator {
    pub fn new(source: Arc<dyn MetadataSource>, options: RegistryOptions) -> Self {
        Self {
            source,
            options,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub async fn investigate(
        &self,
        manifests: &[ProjectManifest],
    ) -> Result<InvestigationResult, InvestigationError> {
        if manifests.is_empty() {
            return Err(InvestigationError::NoProjects);
        }

        let progress = self.progress_bar();
        let mut registry = NodeRegistry::new(self.source.clone(), self.options.clone());
        if let Some(pb) = &progress {
            registry = registry.with_progress(pb.clone());
        }

        info!(projects = manifests.len(), source = self.source.name(), "building dependency graph");
        let builder = GraphBuilder::new(&registry);
        let built = join_all(
            manifests
                .iter()
                .map(|m| builder.build(&m.name, &m.entries)),
        )
        .await;

        let mut projects = Vec::with_capacity(built.len());
        let mut diagnostics = Vec::new();
        for (subgraph, project_diagnostics) in built {
            projects.push(subgraph);
            diagnostics.extend(project_diagnostics);
        }

        let (graph, lookup_diagnostics) = registry.freeze();
        diagnostics.extend(lookup_diagnostics);
        if let Some(pb) = progress {
            pb.finish_with_message("resolved");
        }

        info!(packages = graph.len(), "propagating compatibility");
        Propagator::new(&graph).resolve_all();
        diagnostics.extend(cycle_diagnostics(&graph));

        Ok(InvestigationResult::new(projects, graph, diagnostics))
    }

    fn progress_bar(&self) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }
        let pb = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        Some(pb)
    }
}

/// One diagnostic per dependency cycle, naming its members.
fn cycle_diagnostics(graph: &DependencyGraph) -> Vec<Diagnostic> {
    tarjan_scc(graph.inner())
        .into_iter()
        .filter(|component| component.len() > 1 || graph.has_self_edge(component[0]))
        .map(|component| {
            let mut members: Vec<String> = component
                .iter()
                .map(|id| graph.node(*id).identity.to_string())
                .collect();
            members.sort();
            Diagnostic::new(
                None,
                DiagnosticKind::CycleDetected,
                format!("dependency cycle: {}", members.join(", ")),
            )
        })
        .collect()
}
