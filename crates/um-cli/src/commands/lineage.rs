//! Lineage command implementation - direct neighbours of one node

use anyhow::Result;
use std::fmt::Write;
use um_meta::{Neighbour, NodeLineage};

use crate::cli::{GlobalArgs, LineageArgs, LineageDirection, LineageOutput};
use crate::commands::common::{column_width, load_config, open_store, ExitCode};

/// Execute the lineage command
pub async fn execute(args: &LineageArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let store = open_store(&config, args.fresh)?;

    let Some(mut lineage) = store.get_lineage(&args.id) else {
        eprintln!("Node not found: {}", args.id);
        return Err(ExitCode(1).into());
    };
    match args.direction {
        LineageDirection::Upstream => lineage.downstream.clear(),
        LineageDirection::Downstream => lineage.upstream.clear(),
        LineageDirection::Both => {}
    }

    match args.output {
        LineageOutput::Json => println!("{}", serde_json::to_string_pretty(&lineage)?),
        LineageOutput::Dot => print!("{}", to_dot(&lineage)),
        LineageOutput::Table => print_table(&lineage),
    }
    Ok(())
}

/// Render the node and its neighbours as a Graphviz digraph
pub(crate) fn to_dot(lineage: &NodeLineage) -> String {
    let id = lineage.node.global_id.as_str();
    let mut out = String::from("digraph lineage {\n  rankdir=LR;\n");
    let _ = writeln!(out, "  \"{}\" [style=bold];", escape(id));
    for n in &lineage.upstream {
        let _ = writeln!(
            out,
            "  \"{}\" -> \"{}\" [label=\"{}\"];",
            escape(&n.id),
            escape(id),
            n.origin
        );
    }
    for n in &lineage.downstream {
        let _ = writeln!(
            out,
            "  \"{}\" -> \"{}\" [label=\"{}\"];",
            escape(id),
            escape(&n.id),
            n.origin
        );
    }
    out.push_str("}\n");
    out
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn print_table(lineage: &NodeLineage) {
    println!(
        "{} ({}, {})",
        lineage.node.global_id, lineage.node.kind, lineage.node.owning_project
    );
    if lineage.upstream.is_empty() && lineage.downstream.is_empty() {
        println!("No lineage edges found.");
        return;
    }

    let all = || lineage.upstream.iter().chain(&lineage.downstream);
    let id_width = column_width(all().map(|n| n.id.as_str()), "NODE");
    let project_width = column_width(all().map(|n| n.project.as_str()), "PROJECT");

    println!();
    println!(
        "{:<10}  {:<id_width$}  {:<project_width$}  {:<6}  ORIGIN",
        "DIRECTION", "NODE", "PROJECT", "KIND"
    );
    println!("{}", "-".repeat(10 + id_width + project_width + 6 + 8 + 26));
    let print_rows = |direction: &str, neighbours: &[Neighbour]| {
        for n in neighbours {
            println!(
                "{:<10}  {:<id_width$}  {:<project_width$}  {:<6}  {}",
                direction,
                n.id.as_str(),
                n.project.as_str(),
                n.kind.to_string(),
                n.origin
            );
        }
    };
    print_rows("upstream", &lineage.upstream);
    print_rows("downstream", &lineage.downstream);

    println!(
        "\n{} upstream, {} downstream",
        lineage.upstream.len(),
        lineage.downstream.len()
    );
}

#[cfg(test)]
#[path = "lineage_test.rs"]
mod tests;
