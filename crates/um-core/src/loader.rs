//! Manifest loader
//!
//! Turns one project's manifest (and optional catalog) into a [`NodeTable`]:
//! the project's models and sources keyed by local name, plus the raw
//! dependency ids each model declares. Nothing here knows about other
//! projects; global identities are assigned later.

use crate::artifacts::{ArtifactSource, RawCatalog, RawColumn, RawManifest, RawNode, RawSource};
use crate::error::{CoreError, CoreResult};
use crate::ids::{GlobalId, ProjectId};
use crate::node::{Column, Node, NodeKind};
use crate::project::{slugify, Project};
use crate::projection::extract_projection_columns;
use std::collections::HashMap;

const DEFAULT_MATERIALIZATION: &str = "view";

/// A node as loaded from one manifest, before it has a global id.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalNode {
    /// Manifest unique id (`model.pkg.name`, `source.pkg.src.table`)
    pub unique_id: String,
    pub local_name: String,
    pub kind: NodeKind,
    pub schema: Option<String>,
    pub database: Option<String>,
    pub materialized: Option<String>,
    pub description: Option<String>,
    pub columns: Vec<Column>,
    pub raw_text: Option<String>,
    pub source_name: Option<String>,
    pub identifier: Option<String>,
    pub file_path: Option<String>,
    pub tags: Vec<String>,
}

impl LocalNode {
    /// Attach identity and produce the graph node.
    pub fn into_node(self, global_id: GlobalId, owning_project: ProjectId) -> Node {
        Node {
            global_id,
            local_name: self.local_name,
            owning_project,
            kind: self.kind,
            schema: self.schema,
            database: self.database,
            materialized: self.materialized,
            description: self.description,
            columns: self.columns,
            raw_text: self.raw_text,
            source_name: self.source_name,
            identifier: self.identifier,
            file_path: self.file_path,
            tags: self.tags,
            user_edited: false,
            ai_description: None,
        }
    }
}

/// A dependency declared in the manifest, still in manifest terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDependency {
    /// Local name of the model that declares the dependency
    pub referencing: String,
    /// Raw manifest unique id it depends on
    pub dependency_id: String,
}

/// Everything one project contributes to the unified graph.
#[derive(Debug, Clone)]
pub struct NodeTable {
    pub project: Project,
    /// Package name the manifest declares for itself
    pub package_name: String,
    /// Models first, then sources, each in unique-id order
    pub nodes: Vec<LocalNode>,
    pub dependencies: Vec<ManifestDependency>,
}

impl NodeTable {
    /// Find an owned node by its manifest unique id
    pub fn by_unique_id(&self, unique_id: &str) -> Option<&LocalNode> {
        self.nodes.iter().find(|n| n.unique_id == unique_id)
    }

    /// Local names of the models in this table
    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Model)
            .map(|n| n.local_name.as_str())
    }
}

/// Result of loading one project
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(NodeTable),
    /// The project has not been built; callers skip it
    ManifestMissing,
}

/// Load a project's node table through `artifacts`.
///
/// A malformed manifest is an error for this project only. A malformed
/// catalog is logged and ignored.
pub fn load(project: &Project, artifacts: &dyn ArtifactSource) -> CoreResult<LoadOutcome> {
    let Some(manifest) = artifacts.manifest(project)? else {
        log::warn!(
            "{}",
            CoreError::ManifestMissing {
                project: project.id.to_string(),
                path: project.root_path.display().to_string(),
            }
        );
        return Ok(LoadOutcome::ManifestMissing);
    };

    let catalog = match artifacts.catalog(project) {
        Ok(catalog) => catalog,
        Err(e) => {
            log::warn!("Ignoring catalog of project '{}': {}", project.id, e);
            None
        }
    };

    Ok(LoadOutcome::Loaded(build_table(
        project,
        manifest,
        catalog.as_ref(),
    )))
}

/// Build a node table from already-parsed artifacts.
pub fn build_table(
    project: &Project,
    manifest: RawManifest,
    catalog: Option<&RawCatalog>,
) -> NodeTable {
    let package_name = manifest
        .metadata
        .project_name
        .clone()
        .unwrap_or_else(|| project.display_name.clone());
    let owns = |package: &Option<String>| match package {
        Some(p) => p == &package_name || slugify(p) == project.id.as_str(),
        None => true,
    };

    let mut nodes = Vec::new();
    let mut dependencies = Vec::new();

    for (unique_id, raw) in manifest.nodes {
        if raw.resource_type != "model" || raw.name.is_empty() {
            continue;
        }
        if !owns(&raw.package_name) {
            log::debug!(
                "Project '{}': skipping {} owned by package {:?}",
                project.id,
                unique_id,
                raw.package_name
            );
            continue;
        }
        for dep in &raw.depends_on.nodes {
            dependencies.push(ManifestDependency {
                referencing: raw.name.clone(),
                dependency_id: dep.clone(),
            });
        }
        nodes.push(model_node(unique_id, raw, catalog));
    }

    for (unique_id, raw) in manifest.sources {
        if raw.name.is_empty() || !owns(&raw.package_name) {
            continue;
        }
        nodes.push(source_node(unique_id, raw, catalog));
    }

    log::debug!(
        "Project '{}': loaded {} nodes, {} manifest dependencies",
        project.id,
        nodes.len(),
        dependencies.len()
    );

    NodeTable {
        project: project.clone(),
        package_name,
        nodes,
        dependencies,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn model_node(unique_id: String, raw: RawNode, catalog: Option<&RawCatalog>) -> LocalNode {
    let raw_text = non_empty(raw.raw_code).or_else(|| non_empty(raw.raw_sql));
    let mut columns = catalog_columns(&raw.name, &unique_id, catalog, &raw.columns)
        .or_else(|| declared_columns(&raw.name, &raw.columns))
        .unwrap_or_default();
    if columns.is_empty() {
        if let Some(text) = &raw_text {
            columns = extract_projection_columns(text)
                .into_iter()
                .map(|name| Column::new(&raw.name, name, None, None))
                .collect();
        }
    }

    LocalNode {
        unique_id,
        kind: NodeKind::Model,
        schema: non_empty(raw.config.schema).or_else(|| non_empty(raw.schema)),
        database: non_empty(raw.database),
        materialized: Some(
            non_empty(raw.config.materialized)
                .unwrap_or_else(|| DEFAULT_MATERIALIZATION.to_string()),
        ),
        description: non_empty(raw.description),
        columns,
        raw_text,
        source_name: None,
        identifier: None,
        file_path: non_empty(raw.original_file_path),
        tags: raw.tags,
        local_name: raw.name,
    }
}

fn source_node(unique_id: String, raw: RawSource, catalog: Option<&RawCatalog>) -> LocalNode {
    let columns = catalog_columns(&raw.name, &unique_id, catalog, &raw.columns)
        .or_else(|| declared_columns(&raw.name, &raw.columns))
        .unwrap_or_default();
    let identifier = non_empty(raw.identifier).filter(|id| id != &raw.name);

    LocalNode {
        unique_id,
        kind: NodeKind::Source,
        schema: non_empty(raw.schema),
        database: non_empty(raw.database),
        materialized: None,
        description: non_empty(raw.description),
        columns,
        raw_text: None,
        source_name: non_empty(Some(raw.source_name)),
        identifier,
        file_path: non_empty(raw.original_file_path),
        tags: raw.tags,
        local_name: raw.name,
    }
}

/// Catalog columns in catalog order, borrowing manifest descriptions.
fn catalog_columns(
    node_name: &str,
    unique_id: &str,
    catalog: Option<&RawCatalog>,
    declared: &[(String, RawColumn)],
) -> Option<Vec<Column>> {
    let entry = catalog?.entry(unique_id)?;
    if entry.columns.is_empty() {
        return None;
    }

    let declared_descriptions: HashMap<String, &str> = declared
        .iter()
        .filter_map(|(key, col)| {
            let name = col.name.as_deref().unwrap_or(key);
            col.description
                .as_deref()
                .filter(|d| !d.trim().is_empty())
                .map(|d| (name.to_lowercase(), d))
        })
        .collect();

    let mut ordered: Vec<_> = entry.columns.iter().collect();
    ordered.sort_by_key(|(key, col)| (col.index.unwrap_or(i64::MAX), key.to_string()));

    Some(
        ordered
            .into_iter()
            .map(|(key, col)| {
                let name = col.name.clone().unwrap_or_else(|| key.clone());
                let description = non_empty(col.comment.clone()).or_else(|| {
                    declared_descriptions
                        .get(&name.to_lowercase())
                        .map(|d| d.to_string())
                });
                Column::new(node_name, name, col.data_type.clone(), description)
            })
            .collect(),
    )
}

/// Columns declared in project YAML, in declaration order.
fn declared_columns(node_name: &str, declared: &[(String, RawColumn)]) -> Option<Vec<Column>> {
    if declared.is_empty() {
        return None;
    }
    Some(
        declared
            .iter()
            .map(|(key, col)| {
                Column::new(
                    node_name,
                    col.name.clone().unwrap_or_else(|| key.clone()),
                    non_empty(col.data_type.clone()),
                    non_empty(col.description.clone()),
                )
            })
            .collect(),
    )
}

#[cfg(test)]
#[path = "loader_test.rs"]
mod tests;
