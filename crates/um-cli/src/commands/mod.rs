//! CLI command implementations

pub(crate) mod build;
pub(crate) mod common;
pub(crate) mod cycles;
pub(crate) mod describe;
pub(crate) mod lineage;
pub(crate) mod ls;
pub(crate) mod serve;
