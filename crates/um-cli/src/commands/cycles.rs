//! Cycles command: report strongly connected components

use anyhow::Result;

use crate::cli::{CyclesArgs, GlobalArgs, ReportFormat};
use crate::commands::common::{load_config, open_store, ExitCode};

/// Execute the cycles command. Exits with 1 when any cycle exists.
pub async fn execute(args: &CyclesArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let store = open_store(&config, args.fresh)?;
    let cycles = store.snapshot().graph.cycles();

    match args.output {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&cycles)?),
        ReportFormat::Table => {
            if cycles.is_empty() {
                println!("No cycles found.");
            }
            for (i, cycle) in cycles.iter().enumerate() {
                let members: Vec<&str> = cycle.iter().map(|id| id.as_str()).collect();
                println!("cycle {}: {}", i + 1, members.join(", "));
            }
        }
    }

    if !cycles.is_empty() {
        return Err(ExitCode(1).into());
    }
    Ok(())
}
