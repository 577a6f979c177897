//! um-refs - Reference extraction for unimeta
//!
//! Recovers `ref(...)` and `source(...)` calls from model source text so
//! that cross-project dependencies missing from a manifest can still be
//! linked. This is a lexical scanner over template blocks, not a template
//! engine: only string-literal arguments are understood.

pub mod error;
pub mod extractor;
pub mod grammar;
pub mod walker;

pub use error::{RefError, RefResult};
pub use extractor::{extract, ReferenceExtractor, ReferenceIntent, RefTarget};
pub use grammar::{scan_calls, CallKind, RefCall};
pub use walker::{FsWalker, SourceFile, TextFileWalker};
