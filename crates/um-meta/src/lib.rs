//! um-meta - Unified metadata store for unimeta
//!
//! Holds the published snapshot of projects, nodes and edges behind an
//! atomically swapped `Arc`, and owns everything that changes it: the
//! refresh service (one build at a time), description edits, the
//! enrichment pass and the background poller.

pub mod document;
pub mod enrich;
pub mod error;
pub mod refresh;
pub mod store;
pub mod watcher;

pub use document::SnapshotDocument;
pub use enrich::{enrich, DescriptionEnricher, EnrichReport, EnrichTarget, NoopEnricher};
pub use error::{MetaError, MetaResult};
pub use refresh::{RefreshReport, RefreshService, RefreshStatus, RefreshTrigger};
pub use store::{
    Enrichment, EntityType, MetadataStore, Neighbour, NodeFilter, NodeLineage, Snapshot,
};
pub use watcher::{fingerprint, Fingerprint, Poller, PollerHandle, PollerStatus};
