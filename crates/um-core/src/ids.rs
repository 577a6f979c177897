//! Strongly-typed identifiers for projects and graph nodes.

use crate::newtype_string::define_id;

define_id! {
    /// Slug identifying one discovered project (`customer_project`).
    pub struct ProjectId;
}

define_id! {
    /// Process-wide unique node identifier, `{project_id}_{local_name}`.
    pub struct GlobalId;
}

impl GlobalId {
    /// Compose the global id of a node owned by `project`.
    pub fn compose(project: &ProjectId, local_name: &str) -> Self {
        Self(format!("{}_{}", project, local_name))
    }
}

#[cfg(test)]
#[path = "ids_test.rs"]
mod tests;
