//! Graph vertex and edge types shared by every stage of the pipeline.

use crate::ids::{GlobalId, ProjectId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a graph node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A model built by the project
    Model,
    /// An external table declared in a source block
    Source,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Model => write!(f, "model"),
            NodeKind::Source => write!(f, "source"),
        }
    }
}

/// A model or source table in the unified graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub global_id: GlobalId,
    pub local_name: String,
    pub owning_project: ProjectId,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materialized: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    /// Logical source grouping (`source('<source_name>', ...)`), sources only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    /// Physical table name when it differs from `local_name`, sources only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Description was written by a person and must not be overwritten
    #[serde(default)]
    pub user_edited: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_description: Option<String>,
}

impl Node {
    /// Find a column by exact name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Mutable column lookup by exact name
    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Name of the physical table this node reads or writes
    pub fn table_name(&self) -> &str {
        self.identifier.as_deref().unwrap_or(&self.local_name)
    }
}

/// A column of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub is_foreign_key: bool,
    #[serde(default)]
    pub user_edited: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_description: Option<String>,
}

impl Column {
    /// Create a column of `node_name`, flagging keys by naming convention.
    ///
    /// Primary: `id`, `<node>_id`, `key` or `primary_key` (case-insensitive).
    /// Foreign: any other name containing `_id`.
    pub fn new(
        node_name: &str,
        name: impl Into<String>,
        data_type: Option<String>,
        description: Option<String>,
    ) -> Self {
        let name = name.into();
        let lowered = name.to_lowercase();
        let own_key = format!("{}_id", node_name.to_lowercase());
        let is_primary_key = matches!(lowered.as_str(), "id" | "key" | "primary_key")
            || lowered == own_key;
        let is_foreign_key = !is_primary_key && lowered.contains("_id");
        Self {
            name,
            data_type,
            description,
            is_primary_key,
            is_foreign_key,
            user_edited: false,
            ai_description: None,
        }
    }
}

/// Which extraction mechanism produced an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeOrigin {
    /// Configured by an operator
    ManualOverride,
    /// `ref('<name>', '<project>')` naming a known project
    ExplicitCrossProjectRef,
    /// Structured dependency list in the build manifest
    ManifestDependency,
    /// `source('<source_name>', '<table>')`
    SourceReference,
    /// Unqualified text match or name-based bridging
    HeuristicTextMatch,
}

impl EdgeOrigin {
    /// Trust rank; higher wins when two origins connect the same pair.
    pub fn priority(self) -> u8 {
        match self {
            EdgeOrigin::ManualOverride => 5,
            EdgeOrigin::ExplicitCrossProjectRef => 4,
            EdgeOrigin::ManifestDependency => 3,
            EdgeOrigin::SourceReference => 2,
            EdgeOrigin::HeuristicTextMatch => 1,
        }
    }

    /// Stable snake_case name
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeOrigin::ManualOverride => "manual_override",
            EdgeOrigin::ExplicitCrossProjectRef => "explicit_cross_project_ref",
            EdgeOrigin::ManifestDependency => "manifest_dependency",
            EdgeOrigin::SourceReference => "source_reference",
            EdgeOrigin::HeuristicTextMatch => "heuristic_text_match",
        }
    }
}

impl fmt::Display for EdgeOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directed lineage link: `target` is derived from `source`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: GlobalId,
    pub target: GlobalId,
    pub origin: EdgeOrigin,
}

impl Edge {
    pub fn new(source: GlobalId, target: GlobalId, origin: EdgeOrigin) -> Self {
        Self {
            source,
            target,
            origin,
        }
    }
}

#[cfg(test)]
#[path = "node_test.rs"]
mod tests;
