//! Build pipeline: discovery, per-project load and extraction, then the
//! global resolve and graph build.
//!
//! The per-project step ([`load_project`]) reads nothing but its own
//! project, so callers may run it concurrently and feed the results to
//! [`assemble`] in any order.

use crate::diagnostics::{BuildDiagnostics, SkippedProject};
use crate::graph::LineageGraph;
use crate::resolver::{resolve, ResolveOptions};
use std::collections::{BTreeMap, BTreeSet};
use um_core::{
    discover, load, ArtifactSource, Config, CoreResult, FsArtifacts, LoadOutcome, Project,
    ProjectId,
};
use um_refs::{FsWalker, ReferenceExtractor, TextFileWalker};

pub use crate::resolver::ProjectLoad;

/// Outcome of the per-project step
#[derive(Debug, Clone)]
pub enum ProjectStep {
    Loaded(ProjectLoad),
    Skipped(SkippedProject),
}

/// Result of a full build
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    /// Projects that contributed nodes, in id order
    pub projects: Vec<Project>,
    pub graph: LineageGraph,
    pub diagnostics: BuildDiagnostics,
}

/// Load one project's node table and extract its reference intents.
///
/// A missing or malformed manifest skips the project; it never fails the
/// build.
pub fn load_project(
    project: &Project,
    known_projects: &BTreeSet<ProjectId>,
    artifacts: &dyn ArtifactSource,
    walker: &dyn TextFileWalker,
) -> ProjectStep {
    let table = match load(project, artifacts) {
        Ok(LoadOutcome::Loaded(table)) => table,
        Ok(LoadOutcome::ManifestMissing) => {
            return ProjectStep::Skipped(SkippedProject {
                project: project.id.clone(),
                reason: "manifest not found".to_string(),
            })
        }
        Err(e) => {
            log::warn!("Skipping project '{}': {}", project.id, e);
            return ProjectStep::Skipped(SkippedProject {
                project: project.id.clone(),
                reason: e.to_string(),
            });
        }
    };

    let intents = ReferenceExtractor::new(known_projects).extract_table(&table, walker);
    log::debug!(
        "Project '{}': {} reference intents",
        project.id,
        intents.len()
    );
    ProjectStep::Loaded(ProjectLoad { table, intents })
}

/// Fan-in: resolve identities across all loaded projects and build the graph.
pub fn assemble(steps: Vec<ProjectStep>, options: &ResolveOptions) -> BuildOutput {
    let mut loads: BTreeMap<ProjectId, ProjectLoad> = BTreeMap::new();
    let mut skipped = Vec::new();
    for step in steps {
        match step {
            ProjectStep::Loaded(load) => {
                loads.insert(load.table.project.id.clone(), load);
            }
            ProjectStep::Skipped(s) => skipped.push(s),
        }
    }
    skipped.sort_by(|a, b| a.project.cmp(&b.project));

    let projects: Vec<Project> = loads.values().map(|l| l.table.project.clone()).collect();
    let resolution = resolve(&loads, options);
    let (graph, dropped_edges) = LineageGraph::build_with_report(resolution.nodes, resolution.edges);

    log::info!(
        "Built lineage graph: {} projects, {} nodes, {} edges",
        projects.len(),
        graph.node_count(),
        graph.edge_count()
    );

    BuildOutput {
        projects,
        graph,
        diagnostics: BuildDiagnostics {
            skipped_projects: skipped,
            duplicates: resolution.duplicates,
            unresolved: resolution.unresolved,
            dropped_edges,
        },
    }
}

/// Run the whole pipeline sequentially with the file-system collaborators.
///
/// Fails only when discovery fails (duplicate project ids).
pub fn build(config: &Config) -> CoreResult<BuildOutput> {
    let projects = discover(&config.projects_dir, &config.descriptor_files)?;
    let known: BTreeSet<ProjectId> = projects.iter().map(|p| p.id.clone()).collect();
    let artifacts = FsArtifacts::from_config(config);
    let walker = FsWalker::new(config.source_extensions.clone());

    let steps = projects
        .iter()
        .map(|project| load_project(project, &known, &artifacts, &walker))
        .collect();
    Ok(assemble(steps, &ResolveOptions::from_config(config)))
}
