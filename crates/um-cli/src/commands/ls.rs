//! List command implementation

use anyhow::Result;
use serde::Serialize;
use um_core::{Node, NodeKind};
use um_meta::NodeFilter;

use crate::cli::{GlobalArgs, KindFilter, LsArgs, ReportFormat};
use crate::commands::common::{column_width, load_config, open_store};

/// Row printed by `ls`
#[derive(Debug, Serialize)]
struct NodeRow<'a> {
    id: &'a str,
    project: &'a str,
    name: &'a str,
    kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    materialized: Option<&'a str>,
    columns: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

impl<'a> From<&'a Node> for NodeRow<'a> {
    fn from(node: &'a Node) -> Self {
        Self {
            id: node.global_id.as_str(),
            project: node.owning_project.as_str(),
            name: &node.local_name,
            kind: node.kind,
            schema: node.schema.as_deref(),
            materialized: node.materialized.as_deref(),
            columns: node.columns.len(),
            description: node.description.as_deref(),
        }
    }
}

/// Execute the ls command
pub async fn execute(args: &LsArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let store = open_store(&config, args.fresh)?;

    let filter = NodeFilter {
        project: args.project.clone(),
        name: args.name.clone(),
        description_contains: args.search.clone(),
        kind: args.kind.map(|k| match k {
            KindFilter::Model => NodeKind::Model,
            KindFilter::Source => NodeKind::Source,
        }),
    };
    let nodes = store.list_nodes(&filter);
    let rows: Vec<NodeRow> = nodes.iter().map(NodeRow::from).collect();

    match args.output {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        ReportFormat::Table => print_table(&rows),
    }
    Ok(())
}

fn print_table(rows: &[NodeRow]) {
    if rows.is_empty() {
        println!("No nodes found.");
        return;
    }

    let id_width = column_width(rows.iter().map(|r| r.id), "ID");
    let project_width = column_width(rows.iter().map(|r| r.project), "PROJECT");
    let kind_width = 6;
    let mat_width = column_width(
        rows.iter().map(|r| r.materialized.unwrap_or("-")),
        "MATERIALIZED",
    );
    let schema_width = column_width(rows.iter().map(|r| r.schema.unwrap_or("-")), "SCHEMA");

    println!(
        "{:<id_width$}  {:<project_width$}  {:<kind_width$}  {:<mat_width$}  {:<schema_width$}  COLUMNS",
        "ID", "PROJECT", "KIND", "MATERIALIZED", "SCHEMA",
    );
    println!(
        "{:-<id_width$}  {:-<project_width$}  {:-<kind_width$}  {:-<mat_width$}  {:-<schema_width$}  {}",
        "", "", "", "", "", "-".repeat(7),
    );
    for row in rows {
        println!(
            "{:<id_width$}  {:<project_width$}  {:<kind_width$}  {:<mat_width$}  {:<schema_width$}  {}",
            row.id,
            row.project,
            row.kind.to_string(),
            row.materialized.unwrap_or("-"),
            row.schema.unwrap_or("-"),
            row.columns,
        );
    }
    println!("\n{} node(s)", rows.len());
}
