//! Data-quality findings produced by a build.
//!
//! None of these abort a build. They are logged as they occur and kept so
//! operators can query them after the fact.

use serde::Serialize;
use std::fmt;
use um_core::{Edge, GlobalId, ProjectId};

/// A project left out of the build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedProject {
    pub project: ProjectId,
    pub reason: String,
}

/// Second node claiming an already-assigned global id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateNode {
    pub global_id: GlobalId,
    pub project: ProjectId,
    pub local_name: String,
    pub kept_unique_id: String,
    pub rejected_unique_id: String,
}

/// Why a reference produced no edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// No node carries the referenced name
    NotFound,
    /// Several projects carry the name and nothing breaks the tie
    Ambiguous { candidates: Vec<GlobalId> },
    /// The qualifier names no discovered project
    UnknownProject { project: String },
    /// The text that holds the reference belongs to no known model
    UnknownReferencingNode,
}

/// A reference or dependency that could not be linked
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedReference {
    pub raw_reference: String,
    pub project: ProjectId,
    pub referencing: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referencing_id: Option<GlobalId>,
    pub reason: UnresolvedReason,
}

impl fmt::Display for UnresolvedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in {}.{}: ",
            self.raw_reference, self.project, self.referencing
        )?;
        match &self.reason {
            UnresolvedReason::NotFound => write!(f, "no matching node"),
            UnresolvedReason::Ambiguous { candidates } => {
                let names: Vec<&str> = candidates.iter().map(|c| c.as_str()).collect();
                write!(
                    f,
                    "ambiguous between {}; add an explicit project qualifier",
                    names.join(", ")
                )
            }
            UnresolvedReason::UnknownProject { project } => {
                write!(f, "project '{}' was not discovered", project)
            }
            UnresolvedReason::UnknownReferencingNode => {
                write!(f, "'{}' is not a model of this project", self.referencing)
            }
        }
    }
}

/// Why the graph builder refused an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    SelfLoop,
    UnknownEndpoint,
}

/// An edge rejected by the graph builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedEdge {
    pub edge: Edge,
    pub reason: DropReason,
}

/// Everything a build reports besides the graph itself
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildDiagnostics {
    pub skipped_projects: Vec<SkippedProject>,
    pub duplicates: Vec<DuplicateNode>,
    pub unresolved: Vec<UnresolvedReference>,
    pub dropped_edges: Vec<DroppedEdge>,
}

/// Counts of each diagnostic category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticCounts {
    pub skipped_projects: usize,
    pub duplicates: usize,
    pub unresolved: usize,
    pub ambiguous: usize,
    pub dropped_edges: usize,
}

impl BuildDiagnostics {
    pub fn counts(&self) -> DiagnosticCounts {
        DiagnosticCounts {
            skipped_projects: self.skipped_projects.len(),
            duplicates: self.duplicates.len(),
            unresolved: self.unresolved.len(),
            ambiguous: self
                .unresolved
                .iter()
                .filter(|u| matches!(u.reason, UnresolvedReason::Ambiguous { .. }))
                .count(),
            dropped_edges: self.dropped_edges.len(),
        }
    }
}
