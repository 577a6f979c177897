//! Identity resolver
//!
//! Every node gets `global_id = "{project_id}_{local_name}"`. Dependencies
//! and references are then mapped onto those ids:
//!
//! - a manifest unique id owned by the same manifest resolves exactly;
//!   otherwise its package is mapped to a project and looked up there;
//! - a project-qualified reference resolves only inside that project;
//! - an unqualified reference prefers the referencing project, then a
//!   single match anywhere else; several matches are reported as
//!   ambiguous and never guessed.

use crate::diagnostics::{DuplicateNode, UnresolvedReason, UnresolvedReference};
use std::collections::{BTreeMap, HashMap};
use um_core::{
    slugify, Edge, EdgeOrigin, GlobalId, LineageOverride, ManifestDependency, Node, NodeKind,
    NodeTable, ProjectId,
};
use um_refs::{RefTarget, ReferenceIntent};

/// One project's loaded node table and extracted references
#[derive(Debug, Clone)]
pub struct ProjectLoad {
    pub table: NodeTable,
    pub intents: Vec<ReferenceIntent>,
}

/// Knobs for the optional resolution passes
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Link each source to the unique same-named model of another project
    pub bridge_sources_to_models: bool,
    /// Operator-supplied edges
    pub overrides: Vec<LineageOverride>,
}

impl ResolveOptions {
    pub fn from_config(config: &um_core::Config) -> Self {
        Self {
            bridge_sources_to_models: config.bridge_sources_to_models,
            overrides: config.overrides.clone(),
        }
    }
}

/// Output of [`resolve`]
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Nodes in project-id order, then manifest order
    pub nodes: Vec<Node>,
    /// Resolved edges in discovery order, possibly with repeats
    pub edges: Vec<Edge>,
    pub unresolved: Vec<UnresolvedReference>,
    pub duplicates: Vec<DuplicateNode>,
}

#[derive(Debug, Default)]
struct Resolver {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    unresolved: Vec<UnresolvedReference>,
    duplicates: Vec<DuplicateNode>,
    /// global id -> unique id that claimed it
    claimed: HashMap<GlobalId, String>,
    /// (project, local model name) -> global id
    models: HashMap<ProjectId, HashMap<String, GlobalId>>,
    /// local model name -> every owner, in project order
    models_by_name: HashMap<String, Vec<GlobalId>>,
    /// (project, source_name, table) -> global id
    sources: HashMap<(ProjectId, String, String), GlobalId>,
    /// source_name -> projects declaring it, in project order
    source_projects: HashMap<String, Vec<ProjectId>>,
    /// manifest unique id -> global id, per project
    unique_ids: HashMap<ProjectId, HashMap<String, GlobalId>>,
    /// package or project slug -> project
    packages: HashMap<String, ProjectId>,
}

type Target = Result<GlobalId, UnresolvedReason>;

impl Resolver {
    fn register(&mut self, project: &ProjectId, table: &NodeTable) {
        self.packages
            .entry(project.to_string())
            .or_insert_with(|| project.clone());
        self.packages
            .entry(slugify(&table.package_name))
            .or_insert_with(|| project.clone());

        for local in &table.nodes {
            let global_id = GlobalId::compose(project, &local.local_name);
            if let Some(kept) = self.claimed.get(&global_id) {
                let duplicate = DuplicateNode {
                    global_id: global_id.clone(),
                    project: project.clone(),
                    local_name: local.local_name.clone(),
                    kept_unique_id: kept.clone(),
                    rejected_unique_id: local.unique_id.clone(),
                };
                log::warn!(
                    "Duplicate node id '{}': keeping {}, rejecting {}",
                    duplicate.global_id,
                    duplicate.kept_unique_id,
                    duplicate.rejected_unique_id
                );
                self.duplicates.push(duplicate);
                continue;
            }
            self.claimed
                .insert(global_id.clone(), local.unique_id.clone());
            self.unique_ids
                .entry(project.clone())
                .or_default()
                .insert(local.unique_id.clone(), global_id.clone());

            match local.kind {
                NodeKind::Model => {
                    self.models
                        .entry(project.clone())
                        .or_default()
                        .insert(local.local_name.clone(), global_id.clone());
                    self.models_by_name
                        .entry(local.local_name.clone())
                        .or_default()
                        .push(global_id.clone());
                }
                NodeKind::Source => {
                    if let Some(source_name) = &local.source_name {
                        self.sources.insert(
                            (
                                project.clone(),
                                source_name.clone(),
                                local.local_name.clone(),
                            ),
                            global_id.clone(),
                        );
                        let owners = self.source_projects.entry(source_name.clone()).or_default();
                        if !owners.contains(project) {
                            owners.push(project.clone());
                        }
                    }
                }
            }

            self.nodes
                .push(local.clone().into_node(global_id, project.clone()));
        }
    }

    fn project_for(&self, package: &str) -> Option<&ProjectId> {
        self.packages.get(&slugify(package))
    }

    fn model_in(&self, project: &ProjectId, name: &str) -> Option<&GlobalId> {
        self.models.get(project).and_then(|m| m.get(name))
    }

    fn pick(mut candidates: Vec<GlobalId>) -> Target {
        match candidates.len() {
            0 => Err(UnresolvedReason::NotFound),
            1 => Ok(candidates.remove(0)),
            _ => {
                candidates.sort();
                Err(UnresolvedReason::Ambiguous { candidates })
            }
        }
    }

    fn unqualified_model(&self, project: &ProjectId, name: &str) -> Target {
        if let Some(local) = self.model_in(project, name) {
            return Ok(local.clone());
        }
        Self::pick(self.models_by_name.get(name).cloned().unwrap_or_default())
    }

    fn qualified_model(&self, project: &str, name: &str) -> Target {
        let owner = self
            .project_for(project)
            .ok_or_else(|| UnresolvedReason::UnknownProject {
                project: project.to_string(),
            })?;
        self.model_in(owner, name)
            .cloned()
            .ok_or(UnresolvedReason::NotFound)
    }

    fn source(&self, project: &ProjectId, source_name: &str, table: &str) -> Target {
        let key = |p: &ProjectId| (p.clone(), source_name.to_string(), table.to_string());
        if let Some(own) = self.sources.get(&key(project)) {
            return Ok(own.clone());
        }
        let candidates = self
            .source_projects
            .get(source_name)
            .map(|owners| {
                owners
                    .iter()
                    .filter_map(|p| self.sources.get(&key(p)).cloned())
                    .collect()
            })
            .unwrap_or_default();
        Self::pick(candidates)
    }

    /// Resolve a manifest unique id. `Ok(None)` for kinds that are not nodes.
    fn unique_id(&self, project: &ProjectId, raw: &str) -> Result<Option<GlobalId>, UnresolvedReason> {
        if let Some(own) = self.unique_ids.get(project).and_then(|ids| ids.get(raw)) {
            return Ok(Some(own.clone()));
        }
        let parts: Vec<&str> = raw.split('.').collect();
        match parts.as_slice() {
            ["model", package, name, ..] => self.qualified_model(package, name).map(Some),
            ["source", package, source_name, table, ..] => {
                let owner = self
                    .project_for(package)
                    .ok_or_else(|| UnresolvedReason::UnknownProject {
                        project: package.to_string(),
                    })?;
                self.sources
                    .get(&(owner.clone(), source_name.to_string(), table.to_string()))
                    .cloned()
                    .map(Some)
                    .ok_or(UnresolvedReason::NotFound)
            }
            _ => Ok(None),
        }
    }

    fn report(
        &mut self,
        project: &ProjectId,
        referencing: &str,
        referencing_id: Option<GlobalId>,
        raw_reference: &str,
        reason: UnresolvedReason,
    ) {
        let unresolved = UnresolvedReference {
            raw_reference: raw_reference.to_string(),
            project: project.clone(),
            referencing: referencing.to_string(),
            referencing_id,
            reason,
        };
        log::warn!("Unresolved reference {}", unresolved);
        self.unresolved.push(unresolved);
    }

    fn dependency(&mut self, project: &ProjectId, dep: &ManifestDependency) {
        let Some(referencing) = self.model_in(project, &dep.referencing).cloned() else {
            self.report(
                project,
                &dep.referencing,
                None,
                &dep.dependency_id,
                UnresolvedReason::UnknownReferencingNode,
            );
            return;
        };
        match self.unique_id(project, &dep.dependency_id) {
            Ok(Some(upstream)) => self.edges.push(Edge::new(
                upstream,
                referencing,
                EdgeOrigin::ManifestDependency,
            )),
            Ok(None) => log::debug!(
                "Project '{}': {} depends on non-node {}",
                project,
                dep.referencing,
                dep.dependency_id
            ),
            Err(reason) => self.report(
                project,
                &dep.referencing,
                Some(referencing),
                &dep.dependency_id,
                reason,
            ),
        }
    }

    fn intent(&mut self, intent: &ReferenceIntent) {
        let project = &intent.project;
        let Some(referencing) = self.model_in(project, &intent.referencing).cloned() else {
            self.report(
                project,
                &intent.referencing,
                None,
                &intent.raw_text,
                UnresolvedReason::UnknownReferencingNode,
            );
            return;
        };
        let resolved = match &intent.target {
            RefTarget::Model { name } => self
                .unqualified_model(project, name)
                .map(|id| (id, EdgeOrigin::HeuristicTextMatch)),
            RefTarget::QualifiedModel {
                name,
                project: owner,
            } => self
                .qualified_model(owner, name)
                .map(|id| (id, EdgeOrigin::ExplicitCrossProjectRef)),
            RefTarget::Source { source_name, table } => self
                .source(project, source_name, table)
                .map(|id| (id, EdgeOrigin::SourceReference)),
        };
        match resolved {
            Ok((upstream, origin)) => self.edges.push(Edge::new(upstream, referencing, origin)),
            Err(reason) => self.report(
                project,
                &intent.referencing,
                Some(referencing),
                &intent.raw_text,
                reason,
            ),
        }
    }

    /// Link each source to the single model of another project that
    /// materializes the same table.
    fn bridge_sources(&mut self) {
        let mut models_by_table: HashMap<String, Vec<&Node>> = HashMap::new();
        for node in self.nodes.iter().filter(|n| n.kind == NodeKind::Model) {
            models_by_table
                .entry(node.local_name.to_lowercase())
                .or_default()
                .push(node);
        }

        let mut edges = Vec::new();
        let mut ambiguous = Vec::new();
        for source in self.nodes.iter().filter(|n| n.kind == NodeKind::Source) {
            let schemas_agree = |model: &&&Node| match (&model.schema, &source.schema) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                _ => true,
            };
            let candidates: Vec<GlobalId> = models_by_table
                .get(&source.table_name().to_lowercase())
                .map(|models| {
                    models
                        .iter()
                        .filter(|m| m.owning_project != source.owning_project)
                        .filter(schemas_agree)
                        .map(|m| m.global_id.clone())
                        .collect()
                })
                .unwrap_or_default();
            match Self::pick(candidates) {
                Ok(model) => edges.push(Edge::new(
                    model,
                    source.global_id.clone(),
                    EdgeOrigin::HeuristicTextMatch,
                )),
                Err(reason @ UnresolvedReason::Ambiguous { .. }) => ambiguous.push((
                    source.owning_project.clone(),
                    source.local_name.clone(),
                    source.global_id.clone(),
                    format!(
                        "source('{}', '{}')",
                        source.source_name.as_deref().unwrap_or_default(),
                        source.local_name
                    ),
                    reason,
                )),
                Err(_) => {}
            }
        }

        self.edges.extend(edges);
        for (project, local, id, raw, reason) in ambiguous {
            self.report(&project, &local, Some(id), &raw, reason);
        }
    }

    fn overrides(&mut self, overrides: &[LineageOverride]) {
        for o in overrides {
            match (GlobalId::try_new(o.source.trim()), GlobalId::try_new(o.target.trim())) {
                (Some(source), Some(target)) => self.edges.push(Edge::new(
                    source,
                    target,
                    EdgeOrigin::ManualOverride,
                )),
                _ => log::warn!("Ignoring override with empty endpoint: {:?}", o),
            }
        }
    }

    fn finish(self) -> Resolution {
        Resolution {
            nodes: self.nodes,
            edges: self.edges,
            unresolved: self.unresolved,
            duplicates: self.duplicates,
        }
    }
}

/// Assign global ids and resolve every dependency and reference.
///
/// Projects are processed in id order so the result does not depend on the
/// order in which projects were discovered or loaded.
pub fn resolve(loads: &BTreeMap<ProjectId, ProjectLoad>, options: &ResolveOptions) -> Resolution {
    let mut resolver = Resolver::default();

    for (project, load) in loads {
        resolver.register(project, &load.table);
    }
    for (project, load) in loads {
        for dep in &load.table.dependencies {
            resolver.dependency(project, dep);
        }
        for intent in &load.intents {
            resolver.intent(intent);
        }
    }
    if options.bridge_sources_to_models {
        resolver.bridge_sources();
    }
    resolver.overrides(&options.overrides);

    let resolution = resolver.finish();
    log::info!(
        "Resolved {} nodes, {} edges ({} unresolved, {} duplicates)",
        resolution.nodes.len(),
        resolution.edges.len(),
        resolution.unresolved.len(),
        resolution.duplicates.len()
    );
    resolution
}

#[cfg(test)]
#[path = "resolver_test.rs"]
mod tests;
