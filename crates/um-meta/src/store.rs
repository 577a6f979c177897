//! The published metadata snapshot and every read and write against it.
//!
//! Readers clone the current `Arc<Snapshot>` and never block a refresh;
//! writers swap in a new snapshot under a short write lock, cloning the
//! old one only when readers still hold it.

use crate::error::{MetaError, MetaResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::str::FromStr;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use um_core::{Edge, EdgeOrigin, GlobalId, Node, NodeKind, Project, ProjectId};
use um_lineage::{BuildDiagnostics, BuildOutput, LineageGraph};

/// One consistent view of all projects, nodes and edges
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub projects: Vec<Project>,
    pub graph: LineageGraph,
    pub diagnostics: BuildDiagnostics,
    /// When this snapshot replaced the previous one
    pub published_at: Option<DateTime<Utc>>,
}

/// Filters for [`MetadataStore::list_nodes`]; all given filters must match.
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    pub project: Option<String>,
    /// Exact local name
    pub name: Option<String>,
    /// Case-insensitive substring of the description
    pub description_contains: Option<String>,
    pub kind: Option<NodeKind>,
}

impl NodeFilter {
    fn matches(&self, node: &Node) -> bool {
        if let Some(project) = &self.project {
            if node.owning_project.as_str() != project.as_str() {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if &node.local_name != name {
                return false;
            }
        }
        if let Some(needle) = &self.description_contains {
            let needle = needle.to_lowercase();
            let hit = node
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if node.kind != kind {
                return false;
            }
        }
        true
    }
}

/// What a description edit targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType {
    /// `id` is a global node id
    Model,
    /// `id` is `<global_id>:<column_name>`
    Column,
}

impl FromStr for EntityType {
    type Err = MetaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "model" => Ok(EntityType::Model),
            "column" => Ok(EntityType::Column),
            other => Err(MetaError::Validation {
                message: format!("unknown entity type '{}', expected model or column", other),
            }),
        }
    }
}

/// One side of a lineage edge, seen from the other end
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Neighbour {
    pub id: GlobalId,
    pub project: ProjectId,
    pub kind: NodeKind,
    pub origin: EdgeOrigin,
}

/// Direct lineage of one node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeLineage {
    pub node: Node,
    pub upstream: Vec<Neighbour>,
    pub downstream: Vec<Neighbour>,
}

/// A generated description ready to be applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrichment {
    pub node: String,
    /// Column name, or `None` for the node itself
    pub column: Option<String>,
    pub text: String,
}

/// Thread-safe holder of the current snapshot
#[derive(Debug, Default)]
pub struct MetadataStore {
    current: RwLock<Arc<Snapshot>>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Arc<Snapshot>> {
        self.current.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Arc<Snapshot>> {
        self.current.write().unwrap_or_else(|e| e.into_inner())
    }

    /// The current snapshot; stays valid after later swaps
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.read())
    }

    pub fn get_node(&self, id: &str) -> Option<Node> {
        self.snapshot().graph.node(id).cloned()
    }

    /// Direct upstream neighbours; empty for unknown ids
    pub fn get_upstream(&self, id: &str) -> Vec<Node> {
        self.snapshot()
            .graph
            .upstream(id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Direct downstream neighbours; empty for unknown ids
    pub fn get_downstream(&self, id: &str) -> Vec<Node> {
        self.snapshot()
            .graph
            .downstream(id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Direct neighbours of `id` with the origin of each connecting edge,
    /// or `None` for unknown ids.
    pub fn get_lineage(&self, id: &str) -> Option<NodeLineage> {
        let snapshot = self.snapshot();
        let graph = &snapshot.graph;
        let node = graph.node(id)?.clone();
        let neighbour = |other: &GlobalId, origin: EdgeOrigin| {
            graph.node(other).map(|n| Neighbour {
                id: n.global_id.clone(),
                project: n.owning_project.clone(),
                kind: n.kind,
                origin,
            })
        };
        let upstream = graph
            .edges()
            .iter()
            .filter(|e| e.target == id)
            .filter_map(|e| neighbour(&e.source, e.origin))
            .collect();
        let downstream = graph
            .edges()
            .iter()
            .filter(|e| e.source == id)
            .filter_map(|e| neighbour(&e.target, e.origin))
            .collect();
        Some(NodeLineage {
            node,
            upstream,
            downstream,
        })
    }

    pub fn list_projects(&self) -> Vec<Project> {
        self.snapshot().projects.clone()
    }

    pub fn list_nodes(&self, filter: &NodeFilter) -> Vec<Node> {
        self.snapshot()
            .graph
            .nodes()
            .iter()
            .filter(|node| filter.matches(node))
            .cloned()
            .collect()
    }

    pub fn list_edges(&self) -> Vec<Edge> {
        self.snapshot().graph.edges().to_vec()
    }

    pub fn diagnostics(&self) -> BuildDiagnostics {
        self.snapshot().diagnostics.clone()
    }

    /// Replace everything at once. Edges with unknown endpoints are dropped.
    pub fn replace_all(&self, projects: Vec<Project>, nodes: Vec<Node>, edges: Vec<Edge>) {
        let (graph, dropped) = LineageGraph::build_with_report(nodes, edges);
        self.publish(BuildOutput {
            projects,
            graph,
            diagnostics: BuildDiagnostics {
                dropped_edges: dropped,
                ..Default::default()
            },
        });
    }

    /// Swap in a freshly built graph.
    ///
    /// Descriptions edited by a person, and generated descriptions, are
    /// carried over from the previous snapshot for nodes and columns that
    /// still exist.
    pub fn publish(&self, output: BuildOutput) {
        let BuildOutput {
            projects,
            mut graph,
            diagnostics,
        } = output;

        let mut guard = self.write();
        let previous = Arc::clone(&*guard);
        let mut carried = 0usize;
        for old in previous.graph.nodes() {
            if let Some(node) = graph.node_mut(old.global_id.as_str()) {
                carried += carry_edits(old, node);
            }
        }
        if carried > 0 {
            log::debug!("Carried {} edited descriptions into new snapshot", carried);
        }

        *guard = Arc::new(Snapshot {
            projects,
            graph,
            diagnostics,
            published_at: Some(Utc::now()),
        });
    }

    /// Set a model or column description and mark it as edited by a person.
    pub fn update_description(
        &self,
        entity: EntityType,
        id: &str,
        description: &str,
    ) -> MetaResult<Node> {
        let description = description.trim();
        if description.is_empty() {
            return Err(MetaError::Validation {
                message: "description must not be empty".to_string(),
            });
        }
        let (node_id, column) = match entity {
            EntityType::Model => (id, None),
            EntityType::Column => match id.split_once(':') {
                Some((node, column)) if !node.is_empty() && !column.is_empty() => {
                    (node, Some(column))
                }
                _ => {
                    return Err(MetaError::Validation {
                        message: format!("column id '{}' must look like <model_id>:<column>", id),
                    })
                }
            },
        };
        if node_id.is_empty() {
            return Err(MetaError::Validation {
                message: "model id must not be empty".to_string(),
            });
        }

        let mut guard = self.write();
        if guard.graph.node(node_id).is_none() {
            return Err(MetaError::NodeNotFound {
                id: node_id.to_string(),
            });
        }
        if let Some(column) = column {
            let exists = guard
                .graph
                .node(node_id)
                .is_some_and(|n| n.column(column).is_some());
            if !exists {
                return Err(MetaError::ColumnNotFound {
                    node: node_id.to_string(),
                    column: column.to_string(),
                });
            }
        }

        let snapshot = Arc::make_mut(&mut *guard);
        let node = snapshot
            .graph
            .node_mut(node_id)
            .ok_or_else(|| MetaError::NodeNotFound {
                id: node_id.to_string(),
            })?;
        match column {
            None => {
                node.description = Some(description.to_string());
                node.user_edited = true;
            }
            Some(name) => {
                if let Some(col) = node.column_mut(name) {
                    col.description = Some(description.to_string());
                    col.user_edited = true;
                }
            }
        }
        log::info!("Updated description of {}", id);
        Ok(node.clone())
    }

    /// Apply generated descriptions. Fills only descriptions that are still
    /// empty and not edited by a person; returns how many were filled.
    pub fn apply_enrichment(&self, results: Vec<Enrichment>) -> usize {
        if results.is_empty() {
            return 0;
        }
        let mut guard = self.write();
        let snapshot = Arc::make_mut(&mut *guard);
        let mut filled = 0;
        for result in results {
            let Some(node) = snapshot.graph.node_mut(&result.node) else {
                continue;
            };
            match result.column {
                None => {
                    node.ai_description = Some(result.text.clone());
                    if !node.user_edited && node.description.is_none() {
                        node.description = Some(result.text);
                        filled += 1;
                    }
                }
                Some(name) => {
                    let Some(col) = node.column_mut(&name) else {
                        continue;
                    };
                    col.ai_description = Some(result.text.clone());
                    if !col.user_edited && col.description.is_none() {
                        col.description = Some(result.text);
                        filled += 1;
                    }
                }
            }
        }
        filled
    }
}

/// Copy edited and generated descriptions from `old` onto `new`.
fn carry_edits(old: &Node, new: &mut Node) -> usize {
    let mut carried = 0;
    if old.user_edited {
        new.description = old.description.clone();
        new.user_edited = true;
        carried += 1;
    }
    if new.ai_description.is_none() {
        new.ai_description = old.ai_description.clone();
    }
    if !new.user_edited && new.description.is_none() {
        new.description = new.ai_description.clone();
    }

    for old_col in &old.columns {
        let Some(col) = new.column_mut(&old_col.name) else {
            continue;
        };
        if old_col.user_edited {
            col.description = old_col.description.clone();
            col.user_edited = true;
            carried += 1;
        }
        if col.ai_description.is_none() {
            col.ai_description = old_col.ai_description.clone();
        }
        if !col.user_edited && col.description.is_none() {
            col.description = col.ai_description.clone();
        }
    }
    carried
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
