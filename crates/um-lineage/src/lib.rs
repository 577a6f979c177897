//! um-lineage - Cross-project lineage for unimeta
//!
//! Assigns every loaded node its global identity, resolves manifest
//! dependencies and source-text references to global ids, and builds the
//! single deduplicated lineage graph spanning all projects.

pub mod diagnostics;
pub mod graph;
pub mod pipeline;
pub mod resolver;

pub use diagnostics::{
    BuildDiagnostics, DiagnosticCounts, DroppedEdge, DropReason, DuplicateNode, SkippedProject,
    UnresolvedReason, UnresolvedReference,
};
pub use graph::LineageGraph;
pub use pipeline::{assemble, build, load_project, BuildOutput, ProjectLoad, ProjectStep};
pub use resolver::{resolve, Resolution, ResolveOptions};
