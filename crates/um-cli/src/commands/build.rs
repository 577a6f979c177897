//! Build command: one refresh, persisted, with a diagnostics summary

use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use um_lineage::{BuildDiagnostics, DiagnosticCounts};
use um_meta::{MetadataStore, RefreshReport, RefreshService, RefreshTrigger};

use crate::cli::{BuildArgs, GlobalArgs, ReportFormat};
use crate::commands::common::{load_config, restore_snapshot, ExitCode};

/// Build output for `--format json`
#[derive(Debug, Serialize)]
struct BuildSummary<'a> {
    report: &'a RefreshReport,
    diagnostics: &'a BuildDiagnostics,
}

/// Execute the build command
pub async fn execute(args: &BuildArgs, global: &GlobalArgs) -> Result<()> {
    let config = Arc::new(load_config(global)?);
    let store = Arc::new(MetadataStore::new());

    // Seed with the saved snapshot so description edits carry over.
    if let Err(e) = restore_snapshot(&config, &store) {
        log::warn!("Ignoring saved snapshot: {:#}", e);
    }

    let service = RefreshService::new(Arc::clone(&config), Arc::clone(&store));
    let report = service.refresh(RefreshTrigger::Manual).await?;
    let diagnostics = store.diagnostics();

    match args.format {
        ReportFormat::Json => {
            let summary = BuildSummary {
                report: &report,
                diagnostics: &diagnostics,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        ReportFormat::Table => print_summary(&report, &diagnostics, &config.output_path),
    }

    if !report.success {
        return Err(ExitCode(1).into());
    }
    Ok(())
}

fn print_summary(
    report: &RefreshReport,
    diagnostics: &BuildDiagnostics,
    output_path: &std::path::Path,
) {
    if !report.success {
        println!("Build failed: {}", report.message);
        return;
    }

    println!(
        "Built {} node(s) and {} edge(s) across {} project(s) in {}ms",
        report.node_count,
        report.edge_count,
        report.project_count,
        (report.finished_at - report.started_at).num_milliseconds()
    );
    println!("Snapshot written to {}", output_path.display());

    let counts = &report.diagnostics;
    if *counts == DiagnosticCounts::default() {
        return;
    }

    println!();
    for skipped in &diagnostics.skipped_projects {
        println!("  skipped project  {}: {}", skipped.project, skipped.reason);
    }
    for duplicate in &diagnostics.duplicates {
        println!(
            "  duplicate        {} ({} kept, {} rejected)",
            duplicate.global_id, duplicate.kept_unique_id, duplicate.rejected_unique_id
        );
    }
    for unresolved in &diagnostics.unresolved {
        println!("  unresolved       {}", unresolved);
    }
    for dropped in &diagnostics.dropped_edges {
        println!(
            "  dropped edge     {} -> {} ({:?})",
            dropped.edge.source, dropped.edge.target, dropped.reason
        );
    }
    println!(
        "\n{} skipped, {} duplicate(s), {} unresolved ({} ambiguous), {} dropped edge(s)",
        counts.skipped_projects,
        counts.duplicates,
        counts.unresolved,
        counts.ambiguous,
        counts.dropped_edges
    );
}
