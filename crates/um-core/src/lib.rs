//! um-core - Core library for unimeta
//!
//! This crate provides the shared data model (projects, nodes, columns and
//! lineage edges), configuration parsing, project discovery and the
//! per-project manifest loader used by the rest of the unimeta workspace.

pub mod artifacts;
pub mod checksum;
pub mod config;
pub mod error;
pub mod ids;
pub mod loader;
mod newtype_string;
pub mod node;
pub mod project;
pub mod projection;

pub use artifacts::{ArtifactSource, FsArtifacts};
pub use checksum::checksum_lines;
pub use config::{Config, EnrichmentConfig, LineageOverride, ServerConfig, WatchConfig};
pub use error::{CoreError, CoreResult};
pub use ids::{GlobalId, ProjectId};
pub use loader::{load, LoadOutcome, LocalNode, ManifestDependency, NodeTable};
pub use node::{Column, Edge, EdgeOrigin, Node, NodeKind};
pub use project::{discover, slugify, Project};
