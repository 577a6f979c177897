//! unimeta CLI - unified metadata and lineage across dbt projects

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::common::ExitCode;
use commands::{build, cycles, describe, lineage, ls, serve};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    if let Err(err) = run(&cli).await {
        if let Some(code) = err.downcast_ref::<ExitCode>() {
            std::process::exit(code.0);
        }
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Build(args) => build::execute(args, &cli.global).await,
        Commands::Ls(args) => ls::execute(args, &cli.global).await,
        Commands::Lineage(args) => lineage::execute(args, &cli.global).await,
        Commands::Cycles(args) => cycles::execute(args, &cli.global).await,
        Commands::Describe(args) => describe::execute(args, &cli.global).await,
        Commands::Serve(args) => serve::execute(args, &cli.global).await,
    }
}

/// Log to stderr; `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
