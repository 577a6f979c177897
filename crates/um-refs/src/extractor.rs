//! Reference intents
//!
//! A [`ReferenceIntent`] records that some model's source text names another
//! node. Resolution to a global id happens later, once every project's
//! node table is known.

use crate::error::RefResult;
use crate::grammar::{scan_calls, CallKind, RefCall};
use crate::walker::TextFileWalker;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;
use um_core::{slugify, NodeKind, NodeTable, Project, ProjectId};

/// What a reference points at, in source-text terms
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefTarget {
    /// `ref('<name>')`: a model, project unspecified
    Model { name: String },
    /// `ref('<name>', '<project>')`: a model of a named project.
    /// `project` may name no discovered project; resolution reports that.
    QualifiedModel { name: String, project: String },
    /// `source('<source_name>', '<table>')`
    Source { source_name: String, table: String },
}

/// One reference found in a model's source text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceIntent {
    /// Project owning the referencing model
    pub project: ProjectId,
    /// Local name of the model containing the reference
    pub referencing: String,
    pub target: RefTarget,
    /// The call as written, for diagnostics
    pub raw_text: String,
}

/// Extracts reference intents given the full set of project ids.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceExtractor<'a> {
    known_projects: &'a BTreeSet<ProjectId>,
}

impl<'a> ReferenceExtractor<'a> {
    pub fn new(known_projects: &'a BTreeSet<ProjectId>) -> Self {
        Self { known_projects }
    }

    fn is_project(&self, name: &str) -> bool {
        self.known_projects.contains(slugify(name).as_str())
    }

    /// Classify one call. `None` when the call has an unusable shape.
    fn classify(&self, call: &RefCall) -> Option<RefTarget> {
        if call.has_non_literal {
            return None;
        }
        match (call.kind, call.args.as_slice()) {
            (CallKind::Ref, [name]) => Some(RefTarget::Model { name: name.clone() }),
            (CallKind::Ref, [first, second]) => {
                // `(name, project)` is the documented order; the dbt-native
                // `(project, name)` is accepted when only the first names a
                // known project.
                let (name, project) = if !self.is_project(second) && self.is_project(first) {
                    (second, first)
                } else {
                    (first, second)
                };
                Some(RefTarget::QualifiedModel {
                    name: name.clone(),
                    project: slugify(project),
                })
            }
            (CallKind::Source, [source_name, table]) => Some(RefTarget::Source {
                source_name: source_name.clone(),
                table: table.clone(),
            }),
            _ => None,
        }
    }

    /// Scan one piece of source text owned by `referencing`.
    pub fn scan(&self, project: &ProjectId, referencing: &str, text: &str) -> Vec<ReferenceIntent> {
        scan_calls(text)
            .into_iter()
            .filter_map(|call| match self.classify(&call) {
                Some(target) => Some(ReferenceIntent {
                    project: project.clone(),
                    referencing: referencing.to_string(),
                    target,
                    raw_text: call.raw,
                }),
                None => {
                    log::warn!(
                        "Project '{}', model '{}': cannot interpret {}",
                        project,
                        referencing,
                        call.raw
                    );
                    None
                }
            })
            .collect()
    }

    /// Scan every file `walker` yields for `project`.
    pub fn extract(
        &self,
        project: &Project,
        walker: &dyn TextFileWalker,
    ) -> RefResult<Vec<ReferenceIntent>> {
        let mut intents = Vec::new();
        for file in walker.walk(project)? {
            let Some(model) = file.model_name() else {
                continue;
            };
            intents.extend(self.scan(&project.id, &model, &file.content));
        }
        Ok(intents)
    }

    /// Scan a loaded project.
    ///
    /// Files on disk come first, attributed to the model whose manifest
    /// `original_file_path` names them, else to the file stem. Models that
    /// no file accounts for fall back
    /// to the source text stored in the manifest. A walker failure is
    /// logged and leaves only the manifest text.
    pub fn extract_table(
        &self,
        table: &NodeTable,
        walker: &dyn TextFileWalker,
    ) -> Vec<ReferenceIntent> {
        let project = &table.project;
        let mut intents = Vec::new();
        let mut covered: HashSet<String> = HashSet::new();
        let by_path: HashMap<PathBuf, &str> = table
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Model)
            .filter_map(|n| {
                let file = n.file_path.as_ref()?;
                Some((project.root_path.join(file), n.local_name.as_str()))
            })
            .collect();

        match walker.walk(project) {
            Ok(files) => {
                for file in files {
                    let model = match by_path.get(&file.path) {
                        Some(name) => name.to_string(),
                        None => match file.model_name() {
                            Some(stem) => stem,
                            None => continue,
                        },
                    };
                    intents.extend(self.scan(&project.id, &model, &file.content));
                    covered.insert(model);
                }
            }
            Err(e) => log::warn!("Project '{}': {}", project.id, e),
        }

        for node in table
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Model && !covered.contains(&n.local_name))
        {
            if let Some(text) = &node.raw_text {
                intents.extend(self.scan(&project.id, &node.local_name, text));
            }
        }

        intents
    }
}

/// Extract the reference intents of `project`'s model tree.
pub fn extract(
    project: &Project,
    all_project_ids: &BTreeSet<ProjectId>,
    walker: &dyn TextFileWalker,
) -> RefResult<Vec<ReferenceIntent>> {
    ReferenceExtractor::new(all_project_ids).extract(project, walker)
}

#[cfg(test)]
#[path = "extractor_test.rs"]
mod tests;
